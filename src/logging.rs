//! Opt-in `tracing` subscriber setup for applications and demos.
//!
//! The library itself only emits events; nothing here runs unless called.

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives, e.g. `deepexec_mcp=debug`.
pub const LOG_ENV: &str = "DEEPEXEC_LOG";

/// Install a global fmt subscriber filtered by `DEEPEXEC_LOG`, falling back to
/// `default_directive`. A second call returns a configuration error and leaves
/// the first subscriber in place.
pub fn init_tracing(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| Error::configuration(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::configuration(format!("Tracing already initialized: {}", e)))
}
