//! Error types for the medrescue_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medrescue_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Preferences store error
    #[error("State error: {0}")]
    State(String),

    /// Dose calculation declined
    #[error("Dose error: {0}")]
    Dose(#[from] DoseError),

    /// Protocol graph or session error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Reasons the dose engine declines to produce a number.
///
/// None of these are exceptional: the presentation layer shows
/// [`DoseError::user_message`] in place of a dose.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DoseError {
    /// Weight is zero, negative or not a finite number
    #[error("patient weight must be a positive number of kilograms (got {0})")]
    InvalidWeight(f64),

    /// The dosing rule has no per-weight calculation shape
    #[error("no weight-based calculation is available for this dosing rule")]
    UnsupportedRule,

    /// Range rule whose minimum factor exceeds its maximum factor
    #[error("dosing rule has min factor {min_factor} greater than max factor {max_factor}")]
    InvalidRuleConfiguration { min_factor: f64, max_factor: f64 },

    /// Per-kg factor that is negative or not a finite number
    #[error("dosing rule has invalid per-kg factor {0}")]
    InvalidFactor(f64),
}

impl DoseError {
    /// Short prompt suitable for display instead of a dose
    pub fn user_message(&self) -> &'static str {
        match self {
            DoseError::InvalidWeight(_) => "Enter patient weight",
            DoseError::UnsupportedRule => "Calculation not available",
            DoseError::InvalidRuleConfiguration { .. } | DoseError::InvalidFactor(_) => {
                "Dosing rule misconfigured"
            }
        }
    }

    /// True when the caller supplied bad input (as opposed to bad catalog data)
    pub fn is_input_error(&self) -> bool {
        matches!(self, DoseError::InvalidWeight(_))
    }
}

/// Protocol graph construction and navigation errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("node '{from}' references unknown node '{target}'")]
    DanglingNodeReference { from: String, target: String },

    #[error("unknown protocol node '{0}'")]
    UnknownNode(String),

    #[error("protocol graph has no start node '{0}'")]
    MissingStart(String),

    #[error("duplicate protocol node id '{0}'")]
    DuplicateNode(String),

    #[error("protocol graph is empty")]
    EmptyGraph,

    #[error("node '{node}' has no option {index}")]
    InvalidOption { node: String, index: usize },
}
