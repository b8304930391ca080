#![forbid(unsafe_code)]

//! Core domain model and business logic for MedRescue.
//!
//! This crate provides:
//! - Domain types (dosing rules, medications, protocol nodes)
//! - Built-in medication catalog and protocol library
//! - Weight-based dose calculator
//! - Protocol graph sessions with count-down timers
//! - Favorites and recents persistence

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod dosage;
pub mod format;
pub mod warnings;
pub mod calculator;
pub mod protocol;
pub mod session;
pub mod timer;
pub mod preferences;

// Re-export commonly used types
pub use error::{DoseError, Error, ProtocolError, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use dosage::PatientWeight;
pub use calculator::{calculate_dose, calculate_for_medication, DosageResult};
pub use protocol::ProtocolGraph;
pub use session::{ProtocolSession, SessionView, Transition};
pub use timer::{Clock, ManualClock, SystemClock, Ticker, TimerStatus};
pub use preferences::Preferences;
