//! Tracing subscriber setup for binaries.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! whoever owns the process.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `RUST_LOG` directives take precedence over `level` when both are present.
/// `format` is `"json"` for one JSON object per line, anything else for
/// human-readable text.
///
/// # Errors
///
/// Returns an error if `level` is not a valid filter directive or a global
/// subscriber is already installed.
pub fn init_tracing(level: &str, format: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
