//! Logging setup.
//!
//! Logs go to stderr; stdout is reserved for JSON response output.

use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::{GatewayError, Result};

/// Level implied by repeated `-v` flags, if any were given.
pub fn level_from_verbosity(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::DEBUG),
        _ => Some(LevelFilter::TRACE),
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise `default_directive`.
pub fn build_filter(default_directive: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directive)
        .map_err(|e| GatewayError::Config(format!("invalid log level {default_directive:?}: {e}")))
}

/// Install the global subscriber.
pub fn init(default_directive: &str) -> Result<()> {
    let filter = build_filter(default_directive)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| GatewayError::Config(format!("failed to install logger: {e}")))
}
