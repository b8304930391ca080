//! Weight-based dose calculator.
//!
//! Chains the four calculator stages into one call:
//! - Resolve the raw dose from the rule and weight
//! - Apply absolute caps
//! - Format dose and volume strings
//! - Aggregate warnings

use crate::dosage::{apply_caps, resolve_base_dose};
use crate::format::{calculate_volume, format_dose};
use crate::warnings::aggregate_warnings;
use crate::{DoseCalculation, DoseError, Dosage, DosingRule, Medication};

/// Outcome of calculating one dosage line of a medication
#[derive(Clone, Debug)]
pub struct DosageResult<'a> {
    pub dosage: &'a Dosage,
    pub outcome: Result<DoseCalculation, DoseError>,
}

/// Calculate the dose for a patient
///
/// ## Pipeline
///
/// 1. **Resolve**: `weight × factor` (or a min/max range), unrounded
/// 2. **Cap**: absolute max, then absolute min, then range conflict check
/// 3. **Format**: dose string at unit precision, volume string if a
///    concentration is configured
/// 4. **Warn**: capping warnings followed by weight advisories
///
/// Every invalid-input condition comes back as a [`DoseError`]; nothing
/// panics.
pub fn calculate_dose(rule: &DosingRule, weight_kg: f64) -> Result<DoseCalculation, DoseError> {
    let raw = resolve_base_dose(rule, weight_kg)?;
    let capped = apply_caps(raw, rule);

    let dose_string = format_dose(&capped.dose, rule.dose_unit);
    let volume_string = calculate_volume(&capped.dose, rule.concentration.as_ref());
    let warnings = aggregate_warnings(weight_kg, capped.warnings);

    tracing::debug!(
        weight_kg,
        %dose_string,
        warnings = warnings.len(),
        "Calculated dose"
    );

    Ok(DoseCalculation {
        dose: capped.dose,
        unit: rule.dose_unit,
        dose_string,
        volume_string,
        min_applied: capped.min_applied,
        max_applied: capped.max_applied,
        warnings,
    })
}

/// Calculate every weight-based dosage line of a medication
///
/// Dosages without a weight-based rule are skipped. A medication with no
/// such dosages yields an empty list.
pub fn calculate_for_medication(medication: &Medication, weight_kg: f64) -> Vec<DosageResult<'_>> {
    let results: Vec<_> = medication
        .weight_based_dosages()
        .filter_map(|dosage| {
            dosage.rule.as_ref().map(|rule| DosageResult {
                dosage,
                outcome: calculate_dose(rule, weight_kg),
            })
        })
        .collect();

    tracing::info!(
        "Calculated {} weight-based dosages for {} at {} kg",
        results.len(),
        medication.id,
        weight_kg
    );

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::{HIGH_WEIGHT_WARNING, NEONATAL_WARNING};
    use crate::{build_default_catalog, ConcentrationUnit, DoseUnit, RawDose};

    #[test]
    fn test_pediatric_epinephrine_above_max() {
        crate::logging::init_test();
        let rule = DosingRule::per_kg(0.01, DoseUnit::Milligram)
            .max_dose(1.0)
            .concentration(0.1, ConcentrationUnit::MgPerMl);

        let calc = calculate_dose(&rule, 150.0).unwrap();

        assert_eq!(calc.dose, RawDose::single(1.0));
        assert!(calc.max_applied);
        assert!(!calc.min_applied);
        assert_eq!(calc.dose_string, "1.00 mg");
        assert_eq!(calc.volume_string.as_deref(), Some("10.00 mL"));
        assert_eq!(
            calc.warnings,
            vec![
                "Maximum absolute dose of 1 mg applied.".to_string(),
                HIGH_WEIGHT_WARNING.to_string(),
            ]
        );
    }

    #[test]
    fn test_range_with_both_caps() {
        let rule = DosingRule::per_kg_range(10.0, 20.0, DoseUnit::Milligram)
            .min_dose(120.0)
            .max_dose(180.0);

        let calc = calculate_dose(&rule, 10.0).unwrap();

        assert_eq!(calc.dose, RawDose::range(120.0, 180.0));
        assert!(calc.min_applied);
        assert!(calc.max_applied);
        assert_eq!(calc.dose_string, "120.00-180.00 mg");
        assert_eq!(calc.volume_string, None);
    }

    #[test]
    fn test_bad_factor_yields_no_dose_string() {
        let negative = DosingRule::per_kg(-0.5, DoseUnit::Milligram);
        assert_eq!(
            calculate_dose(&negative, 10.0),
            Err(DoseError::InvalidFactor(-0.5))
        );

        let nan = DosingRule::per_kg_range(f64::NAN, 2.0, DoseUnit::Milligram);
        assert!(matches!(
            calculate_dose(&nan, 10.0),
            Err(DoseError::InvalidFactor(_))
        ));
    }

    #[test]
    fn test_neonatal_microgram_range() {
        let rule = DosingRule::per_kg_range(1.0, 2.0, DoseUnit::Microgram);
        let calc = calculate_dose(&rule, 1.5).unwrap();
        assert_eq!(calc.dose_string, "2-3 mcg");
        assert_eq!(calc.warnings, vec![NEONATAL_WARNING.to_string()]);
    }

    #[test]
    fn test_declines_with_distinct_errors() {
        let rule = DosingRule::per_kg(1.0, DoseUnit::Milligram);
        let err = calculate_dose(&rule, 0.0).unwrap_err();
        assert_eq!(err.user_message(), "Enter patient weight");

        let unsupported = DosingRule::unsupported(DoseUnit::Milligram);
        let err = calculate_dose(&unsupported, 10.0).unwrap_err();
        assert_eq!(err, DoseError::UnsupportedRule);
        assert_eq!(err.user_message(), "Calculation not available");

        let inverted = DosingRule::per_kg_range(2.0, 1.0, DoseUnit::Milligram);
        let err = calculate_dose(&inverted, 10.0).unwrap_err();
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_calculate_for_medication_skips_fixed_dosages() {
        let catalog = build_default_catalog();
        let epi = catalog.medications.get("epinephrine").unwrap();

        let results = calculate_for_medication(epi, 20.0);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].dosage.population, "Pediatric Cardiac Arrest");
        let calc = results[0].outcome.as_ref().unwrap();
        assert_eq!(calc.dose_string, "0.20 mg");
        assert_eq!(calc.volume_string.as_deref(), Some("2.00 mL"));
    }

    #[test]
    fn test_atropine_min_dose_for_small_child() {
        let catalog = build_default_catalog();
        let atropine = catalog.medications.get("atropine").unwrap();

        let results = calculate_for_medication(atropine, 3.0);
        let calc = results[0].outcome.as_ref().unwrap();

        // 0.02 mg/kg × 3 kg = 0.06 mg, raised to the 0.1 mg floor
        assert_eq!(calc.dose_string, "0.10 mg");
        assert!(calc.min_applied);
        assert_eq!(
            calc.warnings,
            vec!["Minimum absolute dose of 0.1 mg applied.".to_string()]
        );
    }
}
