//! Tracing setup for the deadlockctl CLI
//!
//! Environment variables:
//!   RUST_LOG                # Log filter (default: info)
//!   DEADLOCKCTL_DEBUG       # Any value: debug level and show targets

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (unless RUST_LOG is explicitly set)
    pub debug: bool,
}

impl TracingConfig {
    pub fn from_env() -> Self {
        Self {
            debug: std::env::var_os("DEADLOCKCTL_DEBUG").is_some(),
        }
    }
}

/// Initialize console tracing. Logs go to stderr; stdout carries only the
/// usage line.
pub fn init(config: &TracingConfig) -> Result<()> {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
