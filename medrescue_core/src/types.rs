//! Core domain types for MedRescue.
//!
//! This module defines the fundamental types used throughout the system:
//! - Dosing rules, units and concentrations
//! - Raw and capped doses produced by the calculator
//! - Medications and their catalog metadata
//! - Protocol nodes, history entries and timer state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::protocol::ProtocolGraph;

// ============================================================================
// Units
// ============================================================================

/// Unit a dose is expressed in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DoseUnit {
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "mcg")]
    Microgram,
    #[serde(rename = "units")]
    Units,
    #[serde(rename = "mL")]
    Milliliter,
}

impl DoseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseUnit::Milligram => "mg",
            DoseUnit::Microgram => "mcg",
            DoseUnit::Units => "units",
            DoseUnit::Milliliter => "mL",
        }
    }

    /// Decimal places used when displaying a dose in this unit
    pub fn display_precision(&self) -> u32 {
        match self {
            DoseUnit::Microgram => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseUnit {
    type Err = String;

    /// Case-insensitive; accepts a few common spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mg" | "milligram" | "milligrams" => Ok(DoseUnit::Milligram),
            "mcg" | "µg" | "ug" | "microgram" | "micrograms" => Ok(DoseUnit::Microgram),
            "units" | "unit" | "u" => Ok(DoseUnit::Units),
            "ml" | "milliliter" | "milliliters" => Ok(DoseUnit::Milliliter),
            other => Err(format!("unknown dose unit '{}'", other)),
        }
    }
}

/// Unit of a concentration (amount per milliliter)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConcentrationUnit {
    #[serde(rename = "mg/mL")]
    MgPerMl,
    #[serde(rename = "mcg/mL")]
    McgPerMl,
    #[serde(rename = "units/mL")]
    UnitsPerMl,
}

impl ConcentrationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConcentrationUnit::MgPerMl => "mg/mL",
            ConcentrationUnit::McgPerMl => "mcg/mL",
            ConcentrationUnit::UnitsPerMl => "units/mL",
        }
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drug amount per milliliter of solution
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Concentration {
    pub value: f64,
    pub unit: ConcentrationUnit,
}

// ============================================================================
// Dosing Rules
// ============================================================================

/// Shape of the weight-based calculation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DoseKind {
    /// Single factor per kilogram
    PerWeightFixed { factor: f64 },
    /// Minimum and maximum factors per kilogram
    PerWeightRange { min_factor: f64, max_factor: f64 },
    /// No per-weight calculation (fixed doses, per-m² dosing, ...)
    Unsupported,
}

/// How to compute a dose for one population/indication
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DosingRule {
    pub kind: DoseKind,
    pub dose_unit: DoseUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_absolute_dose: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_absolute_dose: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentration: Option<Concentration>,
}

impl DosingRule {
    /// Rule of the form `factor × weight`
    pub fn per_kg(factor: f64, dose_unit: DoseUnit) -> Self {
        Self::with_kind(DoseKind::PerWeightFixed { factor }, dose_unit)
    }

    /// Rule of the form `min_factor × weight` to `max_factor × weight`
    pub fn per_kg_range(min_factor: f64, max_factor: f64, dose_unit: DoseUnit) -> Self {
        Self::with_kind(
            DoseKind::PerWeightRange {
                min_factor,
                max_factor,
            },
            dose_unit,
        )
    }

    pub fn unsupported(dose_unit: DoseUnit) -> Self {
        Self::with_kind(DoseKind::Unsupported, dose_unit)
    }

    fn with_kind(kind: DoseKind, dose_unit: DoseUnit) -> Self {
        Self {
            kind,
            dose_unit,
            min_absolute_dose: None,
            max_absolute_dose: None,
            concentration: None,
        }
    }

    pub fn min_dose(mut self, min: f64) -> Self {
        self.min_absolute_dose = Some(min);
        self
    }

    pub fn max_dose(mut self, max: f64) -> Self {
        self.max_absolute_dose = Some(max);
        self
    }

    pub fn concentration(mut self, value: f64, unit: ConcentrationUnit) -> Self {
        self.concentration = Some(Concentration { value, unit });
        self
    }

    /// True if this rule can produce a number from a weight
    pub fn is_weight_based(&self) -> bool {
        !matches!(self.kind, DoseKind::Unsupported)
    }
}

// ============================================================================
// Dose Values
// ============================================================================

/// Dose before formatting, always in the rule's unit
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawDose {
    Single { value: f64 },
    Range { low: f64, high: f64 },
}

impl RawDose {
    pub fn single(value: f64) -> Self {
        RawDose::Single { value }
    }

    pub fn range(low: f64, high: f64) -> Self {
        RawDose::Range { low, high }
    }

    /// Apply `f` to every bound, producing a new dose
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            RawDose::Single { value } => RawDose::Single { value: f(value) },
            RawDose::Range { low, high } => RawDose::Range {
                low: f(low),
                high: f(high),
            },
        }
    }
}

/// Result of applying absolute caps to a raw dose
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CappedDose {
    pub dose: RawDose,
    pub min_applied: bool,
    pub max_applied: bool,
    pub warnings: Vec<String>,
}

/// Complete output of the dose calculator for one dosing rule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseCalculation {
    pub dose: RawDose,
    pub unit: DoseUnit,
    pub dose_string: String,
    pub volume_string: Option<String>,
    pub min_applied: bool,
    pub max_applied: bool,
    pub warnings: Vec<String>,
}

// ============================================================================
// Medications
// ============================================================================

/// One population/indication-specific dosage line
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dosage {
    pub population: String,
    pub details: String,
    #[serde(default)]
    pub rule: Option<DosingRule>,
}

/// Severity of a medication alert
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertLevel {
    #[serde(rename = "High Alert")]
    HighAlert,
    Caution,
    Info,
    #[serde(rename = "Black Box")]
    BlackBox,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::HighAlert => "High Alert",
            AlertLevel::Caution => "Caution",
            AlertLevel::Info => "Info",
            AlertLevel::BlackBox => "Black Box",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MedicationAlert {
    pub level: AlertLevel,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Administration {
    pub routes: Vec<String>,
    pub notes: String,
    #[serde(default)]
    pub monitoring: Vec<String>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PregnancyCategory {
    A,
    B,
    C,
    D,
    X,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OnsetDuration {
    pub onset: String,
    pub duration: String,
}

/// A medication reference entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub generic_name: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: String,
    pub indications: Vec<String>,
    pub contraindications: Vec<String>,
    pub dosages: Vec<Dosage>,
    pub administration: Administration,
    pub alerts: Vec<MedicationAlert>,
    pub concentrations: Vec<String>,
    pub algorithms: Vec<String>,
    pub look_alike_sound_alike: Vec<String>,
    pub pregnancy_category: Option<PregnancyCategory>,
    pub onset_duration: Option<OnsetDuration>,
    pub interactions: Vec<String>,
    pub reversal: Option<String>,
}

impl Medication {
    /// Dosages that carry a weight-based calculation
    pub fn weight_based_dosages(&self) -> impl Iterator<Item = &Dosage> {
        self.dosages
            .iter()
            .filter(|d| d.rule.as_ref().is_some_and(DosingRule::is_weight_based))
    }

    /// Carries a high-alert or black-box alert
    pub fn is_high_alert(&self) -> bool {
        self.alerts
            .iter()
            .any(|a| matches!(a.level, AlertLevel::HighAlert | AlertLevel::BlackBox))
    }
}

// ============================================================================
// Protocol Types
// ============================================================================

/// A labelled branch out of a decision node
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionOption {
    pub label: String,
    pub next: String,
}

/// Kind-specific part of a protocol node
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Start { next: String },
    Action { next: String },
    Medication { medication_id: String, next: String },
    Decision { options: Vec<DecisionOption> },
    Timer { duration_seconds: u32, next: String },
    End,
}

/// One step of a protocol graph
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolNode {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub clinical_notes: Vec<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl ProtocolNode {
    /// The single successor of non-branching nodes
    pub fn next(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Start { next }
            | NodeKind::Action { next }
            | NodeKind::Medication { next, .. }
            | NodeKind::Timer { next, .. } => Some(next),
            NodeKind::Decision { .. } | NodeKind::End => None,
        }
    }

    /// Every node id this node can lead to
    pub fn successors(&self) -> Vec<&str> {
        match &self.kind {
            NodeKind::Decision { options } => options.iter().map(|o| o.next.as_str()).collect(),
            _ => self.next().into_iter().collect(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::End)
    }
}

/// Protocol family shown in listings
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolCategory {
    #[serde(rename = "ACLS")]
    Acls,
    #[serde(rename = "PALS")]
    Pals,
    General,
}

impl fmt::Display for ProtocolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProtocolCategory::Acls => "ACLS",
            ProtocolCategory::Pals => "PALS",
            ProtocolCategory::General => "General",
        };
        f.write_str(label)
    }
}

/// Listing metadata for a protocol
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtocolInfo {
    pub id: String,
    pub title: String,
    pub category: ProtocolCategory,
    pub description: String,
}

/// A protocol's metadata together with its validated graph
#[derive(Clone, Debug)]
pub struct ProtocolDefinition {
    pub info: ProtocolInfo,
    pub graph: ProtocolGraph,
}

/// One visited node in a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Runtime state of one named timer
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerRuntimeState {
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    pub started_at: DateTime<Utc>,
    /// Set once the expiry of this timer has moved the session forward
    pub auto_advanced: bool,
}

// ============================================================================
// Catalog Type
// ============================================================================

/// The complete read-only catalog of medications and protocols
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub medications: HashMap<String, Medication>,
    pub protocols: HashMap<String, ProtocolDefinition>,
}
