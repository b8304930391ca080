//! Display formatting for doses and drawn volumes.
//!
//! Rounding is round-half-up on the decimal representation of the number,
//! so `1.005 mg` displays as `1.01 mg` even though the nearest binary float
//! is slightly below 1.005.

use crate::{Concentration, DoseUnit, RawDose};
use rust_decimal::prelude::*;

/// Decimal places for drawn volumes, independent of the dose unit
pub const VOLUME_PRECISION: u32 = 2;

/// Unit suffix for drawn volumes
pub const VOLUME_UNIT: &str = "mL";

/// Round `value` half-up to `dp` decimal places and render with exactly
/// `dp` digits after the point
pub fn round_half_up(value: f64, dp: u32) -> String {
    // Normalise -0.0 so it never renders as "-0.00"
    let value = if value == 0.0 { 0.0 } else { value };

    match Decimal::from_str(&value.to_string()) {
        Ok(decimal) => {
            let mut rounded =
                decimal.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(dp);
            rounded.to_string()
        }
        Err(_) => {
            // Outside Decimal's range (or not finite); fall back to float formatting
            format!("{:.*}", dp as usize, value)
        }
    }
}

/// Render a dose as `"{value} {unit}"` or `"{low}-{high} {unit}"`
pub fn format_dose(dose: &RawDose, unit: DoseUnit) -> String {
    match *dose {
        RawDose::Single { value } => {
            format!("{} {}", round_half_up(value, unit.display_precision()), unit)
        }
        RawDose::Range { low, high } => format_range(Some(low), Some(high), unit),
    }
}

/// Render a range whose bounds may be missing; a missing bound counts as 0
pub fn format_range(low: Option<f64>, high: Option<f64>, unit: DoseUnit) -> String {
    let dp = unit.display_precision();
    format!(
        "{}-{} {}",
        round_half_up(low.unwrap_or(0.0), dp),
        round_half_up(high.unwrap_or(0.0), dp),
        unit
    )
}

/// Volume to draw for a dose, if a usable concentration is configured
///
/// Returns `None` when the concentration is absent, zero, negative or not
/// finite. Volume is always rendered to two decimal places in mL.
pub fn calculate_volume(dose: &RawDose, concentration: Option<&Concentration>) -> Option<String> {
    let per_ml = concentration
        .map(|c| c.value)
        .filter(|v| v.is_finite() && *v > 0.0)?;

    let volume = match dose.map(|amount| amount / per_ml) {
        RawDose::Single { value } => round_half_up(value, VOLUME_PRECISION),
        RawDose::Range { low, high } => format!(
            "{}-{}",
            round_half_up(low, VOLUME_PRECISION),
            round_half_up(high, VOLUME_PRECISION)
        ),
    };

    Some(format!("{} {}", volume, VOLUME_UNIT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConcentrationUnit;
    use proptest::prelude::*;

    fn conc(value: f64) -> Concentration {
        Concentration {
            value,
            unit: ConcentrationUnit::MgPerMl,
        }
    }

    #[test]
    fn test_format_single_mg() {
        assert_eq!(format_dose(&RawDose::single(25.5), DoseUnit::Milligram), "25.50 mg");
    }

    #[test]
    fn test_format_single_mcg_zero_decimals() {
        assert_eq!(format_dose(&RawDose::single(500.123), DoseUnit::Microgram), "500 mcg");
        assert_eq!(format_dose(&RawDose::single(500.789), DoseUnit::Microgram), "501 mcg");
    }

    #[test]
    fn test_uppercase_unit_parses_to_microgram_precision() {
        let unit: DoseUnit = "MCG".parse().unwrap();
        assert_eq!(format_dose(&RawDose::single(500.789), unit), "501 mcg");
    }

    #[test]
    fn test_format_range() {
        assert_eq!(
            format_dose(&RawDose::range(10.5, 20.25), DoseUnit::Milligram),
            "10.50-20.25 mg"
        );
        assert_eq!(
            format_dose(&RawDose::range(100.2, 200.8), DoseUnit::Microgram),
            "100-201 mcg"
        );
        assert_eq!(
            format_dose(&RawDose::range(0.0, 10.5), DoseUnit::Milligram),
            "0.00-10.50 mg"
        );
    }

    #[test]
    fn test_format_range_missing_bounds_default_to_zero() {
        assert_eq!(format_range(None, Some(10.0), DoseUnit::Milligram), "0.00-10.00 mg");
        assert_eq!(format_range(Some(5.0), None, DoseUnit::Milligram), "5.00-0.00 mg");
    }

    #[test]
    fn test_round_half_up_uses_decimal_representation() {
        assert_eq!(round_half_up(1.005, 2), "1.01");
        assert_eq!(round_half_up(2.675, 2), "2.68");
        assert_eq!(round_half_up(0.5, 0), "1");
        assert_eq!(round_half_up(1.0, 2), "1.00");
        assert_eq!(round_half_up(-0.0, 2), "0.00");
    }

    #[test]
    fn test_other_units_two_decimals() {
        assert_eq!(format_dose(&RawDose::single(3.0), DoseUnit::Units), "3.00 units");
        assert_eq!(format_dose(&RawDose::single(0.333), DoseUnit::Milliliter), "0.33 mL");
    }

    #[test]
    fn test_volume_single() {
        assert_eq!(
            calculate_volume(&RawDose::single(50.0), Some(&conc(10.0))),
            Some("5.00 mL".to_string())
        );
    }

    #[test]
    fn test_volume_range() {
        assert_eq!(
            calculate_volume(&RawDose::range(25.0, 75.0), Some(&conc(10.0))),
            Some("2.50-7.50 mL".to_string())
        );
        assert_eq!(
            calculate_volume(&RawDose::range(0.0, 50.0), Some(&conc(10.0))),
            Some("0.00-5.00 mL".to_string())
        );
    }

    #[test]
    fn test_volume_zero_dose() {
        assert_eq!(
            calculate_volume(&RawDose::single(0.0), Some(&conc(10.0))),
            Some("0.00 mL".to_string())
        );
    }

    #[test]
    fn test_volume_requires_positive_concentration() {
        assert_eq!(calculate_volume(&RawDose::single(50.0), None), None);
        assert_eq!(calculate_volume(&RawDose::single(50.0), Some(&conc(0.0))), None);
        assert_eq!(calculate_volume(&RawDose::single(50.0), Some(&conc(-1.0))), None);
        assert_eq!(calculate_volume(&RawDose::single(50.0), Some(&conc(f64::NAN))), None);
    }

    #[test]
    fn test_microgram_volume_still_two_decimals() {
        let c = Concentration {
            value: 50.0,
            unit: ConcentrationUnit::McgPerMl,
        };
        assert_eq!(
            calculate_volume(&RawDose::single(25.0), Some(&c)),
            Some("0.50 mL".to_string())
        );
    }

    fn decimals(formatted: &str) -> usize {
        let number = formatted.split(' ').next().unwrap();
        number.split('.').nth(1).map_or(0, str::len)
    }

    proptest! {
        #[test]
        fn prop_microgram_has_no_decimals(value in 0.0f64..100_000.0) {
            let s = format_dose(&RawDose::single(value), DoseUnit::Microgram);
            prop_assert_eq!(decimals(&s), 0);
            prop_assert!(s.ends_with(" mcg"));
        }

        #[test]
        fn prop_milligram_has_two_decimals(value in 0.0f64..100_000.0) {
            let s = format_dose(&RawDose::single(value), DoseUnit::Milligram);
            prop_assert_eq!(decimals(&s), 2);
        }

        #[test]
        fn prop_no_volume_without_positive_concentration(
            dose in 0.0f64..1000.0,
            bad in prop_oneof![Just(0.0f64), -1000.0f64..0.0],
        ) {
            prop_assert_eq!(calculate_volume(&RawDose::single(dose), None), None);
            prop_assert_eq!(calculate_volume(&RawDose::single(dose), Some(&conc(bad))), None);
        }
    }
}
