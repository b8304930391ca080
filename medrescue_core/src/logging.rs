//! Tracing setup for MedRescue front ends.
//!
//! `medrescue calc --json` and `medrescue run --json` print machine-readable
//! documents on stdout, so every log line goes to stderr. The default filter
//! only lets warnings through; set `RUST_LOG=medrescue_core=debug` to follow
//! cap decisions, timer expiries and session moves.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when `RUST_LOG` is unset or unparsable
pub const DEFAULT_LEVEL: &str = "warn";

/// Install the stderr subscriber at [`DEFAULT_LEVEL`]
pub fn init() {
    init_with_level(DEFAULT_LEVEL)
}

/// Install the stderr subscriber, filtering at `default_level` unless
/// `RUST_LOG` says otherwise
///
/// Calling this again after a subscriber is installed leaves the first one
/// in place.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Route debug logs through the test harness so they show only for failures
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
