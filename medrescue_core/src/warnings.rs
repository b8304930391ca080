//! Final warning list for a dose calculation.

/// Weights strictly below this (in kg) get the neonatal advisory
pub const NEONATAL_WEIGHT_KG: f64 = 2.0;

/// Weights strictly above this (in kg) get the high-weight advisory
pub const HIGH_WEIGHT_KG: f64 = 100.0;

pub const NEONATAL_WARNING: &str =
    "Neonatal dosing may require specific adjustments and expert verification.";

pub const HIGH_WEIGHT_WARNING: &str = "Patient weight > 100kg. Ensure adult dosing caps/guidelines are considered if not automatically applied by absolute max dose.";

/// Append weight-derived advisories after the capping warnings
///
/// Capping warnings keep their order; a weight of exactly 2 or 100 kg adds
/// nothing, and neither does a non-positive weight.
pub fn aggregate_warnings(weight_kg: f64, cap_warnings: Vec<String>) -> Vec<String> {
    let mut warnings = cap_warnings;

    if weight_kg > 0.0 && weight_kg < NEONATAL_WEIGHT_KG {
        warnings.push(NEONATAL_WARNING.to_string());
    }

    if weight_kg > HIGH_WEIGHT_KG {
        warnings.push(HIGH_WEIGHT_WARNING.to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neonatal_warning_below_two_kg() {
        let warnings = aggregate_warnings(1.5, vec![]);
        assert_eq!(warnings, vec![NEONATAL_WARNING.to_string()]);
    }

    #[test]
    fn test_no_neonatal_warning_at_two_kg() {
        assert!(aggregate_warnings(2.0, vec![]).is_empty());
    }

    #[test]
    fn test_zero_weight_adds_nothing() {
        assert!(aggregate_warnings(0.0, vec![]).is_empty());
    }

    #[test]
    fn test_high_weight_warning() {
        assert_eq!(
            aggregate_warnings(110.0, vec![]),
            vec![HIGH_WEIGHT_WARNING.to_string()]
        );
        assert!(aggregate_warnings(100.0, vec![]).is_empty());
    }

    #[test]
    fn test_existing_warnings_come_first() {
        let warnings = aggregate_warnings(1.8, vec!["Cap applied".to_string()]);
        assert_eq!(
            warnings,
            vec!["Cap applied".to_string(), NEONATAL_WARNING.to_string()]
        );
    }

    #[test]
    fn test_existing_warnings_preserved_for_normal_weight() {
        let warnings = aggregate_warnings(50.0, vec!["A previous warning".to_string()]);
        assert_eq!(warnings, vec!["A previous warning".to_string()]);
    }
}
