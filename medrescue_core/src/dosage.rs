//! Weight-based dose resolution and absolute cap application.
//!
//! These are the first two stages of the calculator:
//! - [`resolve_base_dose`] turns a rule and a weight into a [`RawDose`]
//! - [`apply_caps`] clamps that dose to the rule's absolute minimum/maximum
//!
//! Neither stage rounds; rounding happens only when formatting.

use crate::{CappedDose, DoseError, DoseKind, DoseUnit, DosingRule, RawDose};
use std::str::FromStr;

/// Patient weight in kilograms, guaranteed finite and strictly positive
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct PatientWeight(f64);

impl PatientWeight {
    pub fn new(kg: f64) -> Result<Self, DoseError> {
        if kg.is_finite() && kg > 0.0 {
            Ok(Self(kg))
        } else {
            Err(DoseError::InvalidWeight(kg))
        }
    }

    pub fn kg(self) -> f64 {
        self.0
    }
}

impl FromStr for PatientWeight {
    type Err = DoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kg = s
            .trim()
            .parse::<f64>()
            .map_err(|_| DoseError::InvalidWeight(f64::NAN))?;
        Self::new(kg)
    }
}

/// Compute the uncapped dose for a patient
///
/// Fails with:
/// - [`DoseError::InvalidWeight`] if the weight is not a positive number
/// - [`DoseError::UnsupportedRule`] if the rule has no per-weight shape
/// - [`DoseError::InvalidFactor`] if a factor is negative or not finite
/// - [`DoseError::InvalidRuleConfiguration`] if a range rule has inverted factors
pub fn resolve_base_dose(rule: &DosingRule, weight_kg: f64) -> Result<RawDose, DoseError> {
    let weight = PatientWeight::new(weight_kg)?;

    match rule.kind {
        DoseKind::PerWeightFixed { factor } => {
            check_factor(factor)?;
            Ok(RawDose::single(weight.kg() * factor))
        }
        DoseKind::PerWeightRange {
            min_factor,
            max_factor,
        } => {
            check_factor(min_factor)?;
            check_factor(max_factor)?;
            if min_factor > max_factor {
                tracing::warn!(
                    min_factor,
                    max_factor,
                    "Rejecting dosing rule with inverted per-kg factors"
                );
                return Err(DoseError::InvalidRuleConfiguration {
                    min_factor,
                    max_factor,
                });
            }
            Ok(RawDose::range(
                weight.kg() * min_factor,
                weight.kg() * max_factor,
            ))
        }
        DoseKind::Unsupported => Err(DoseError::UnsupportedRule),
    }
}

fn check_factor(factor: f64) -> Result<(), DoseError> {
    if factor.is_finite() && factor >= 0.0 {
        Ok(())
    } else {
        tracing::warn!(factor, "Rejecting dosing rule with invalid per-kg factor");
        Err(DoseError::InvalidFactor(factor))
    }
}

/// Apply the rule's absolute caps to a raw dose
///
/// ## Cap order
///
/// 1. **Maximum** (if set). For a range, a capped `high` that drops below
///    `low` pulls `low` down with it.
/// 2. **Minimum** (if set), evaluated against the max-capped dose. For a
///    range, a raised `low` that passes `high` pushes `high` up with it, but
///    never above the configured maximum.
/// 3. **Conflict check**: any remaining inversion (only possible when the
///    minimum cap exceeds the maximum cap) is resolved in favour of the
///    maximum.
///
/// Caps trigger on strict inequality only. The input is never modified.
pub fn apply_caps(raw: RawDose, rule: &DosingRule) -> CappedDose {
    let mut result = CappedDose {
        dose: raw,
        min_applied: false,
        max_applied: false,
        warnings: Vec::new(),
    };

    if let Some(max) = rule.max_absolute_dose {
        apply_max_cap(&mut result, max, rule.dose_unit);
    }

    if let Some(min) = rule.min_absolute_dose {
        apply_min_cap(&mut result, min, rule.max_absolute_dose, rule.dose_unit);
    }

    resolve_range_conflict(&mut result);

    if result.min_applied || result.max_applied {
        tracing::debug!(
            min_applied = result.min_applied,
            max_applied = result.max_applied,
            "Absolute dose caps applied: {:?} -> {:?}",
            raw,
            result.dose
        );
    }

    result
}

fn apply_max_cap(result: &mut CappedDose, max: f64, unit: DoseUnit) {
    match &mut result.dose {
        RawDose::Single { value } => {
            if *value > max {
                *value = max;
                result.max_applied = true;
                result.warnings.push(format!(
                    "Maximum absolute dose of {} {} applied.",
                    amount(max),
                    unit
                ));
            }
        }
        RawDose::Range { low, high } => {
            if *high > max {
                *high = max;
                result.max_applied = true;
                result.warnings.push(format!(
                    "Maximum absolute dose of {} {} applied to range.",
                    amount(max),
                    unit
                ));

                if *low > *high {
                    *low = *high;
                    result.min_applied = true;
                    result
                        .warnings
                        .push("Minimum dose in range adjusted to match capped maximum dose.".into());
                }
            }
        }
    }
}

fn apply_min_cap(result: &mut CappedDose, min: f64, max: Option<f64>, unit: DoseUnit) {
    match &mut result.dose {
        RawDose::Single { value } => {
            if *value < min {
                *value = min;
                result.min_applied = true;
                result.warnings.push(format!(
                    "Minimum absolute dose of {} {} applied.",
                    amount(min),
                    unit
                ));
            }
        }
        RawDose::Range { low, high } => {
            if *low < min {
                *low = min;
                result.min_applied = true;
                result.warnings.push(format!(
                    "Minimum absolute dose of {} {} applied to range.",
                    amount(min),
                    unit
                ));

                if *low > *high {
                    // The maximum cap still bounds how far high may be raised
                    let raised = max.map_or(*low, |m| low.min(m));
                    if raised > *high {
                        *high = raised;
                        result.max_applied = true;
                        result.warnings.push(
                            "Maximum dose in range adjusted to match applied minimum dose.".into(),
                        );
                    }
                }
            }
        }
    }
}

fn resolve_range_conflict(result: &mut CappedDose) {
    if let RawDose::Range { low, high } = &mut result.dose {
        if *low > *high {
            tracing::warn!(
                low = *low,
                high = *high,
                "Dose range inverted after capping; clamping min to max"
            );
            result.warnings.push(format!(
                "Dose range conflict: Min dose ({}) exceeded Max dose ({}). Adjusted min to match max.",
                amount(*low),
                amount(*high)
            ));
            *low = *high;
            result.min_applied = true;
        }
    }
}

/// Shortest plain rendering of a number for messages (`100`, `0.5`)
fn amount(value: f64) -> String {
    value.to_string()
}
