//! Subscriber setup for binaries.

use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;

/// Filter from `RUST_LOG` when it parses, otherwise `level`.
pub fn filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()))
}

/// Install the global fmt subscriber. Safe to call more than once; later
/// calls only log that a subscriber is already set.
pub fn init(level: LogLevel) {
    if let Err(e) = fmt().with_env_filter(filter(level)).try_init() {
        warn!(error = %e, "tracing init failed");
    }
}
