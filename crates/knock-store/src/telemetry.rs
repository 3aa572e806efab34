//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::ConfigError;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber described by `config`
///
/// Returns `Ok(false)` when a global subscriber is already installed; the
/// existing one is kept.
///
/// # Errors
/// Returns [`ConfigError::LogFilter`] if the filter directive does not parse.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|e| ConfigError::LogFilter {
        filter: config.filter.clone(),
        message: e.to_string(),
    })?;

    let installed = if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    Ok(installed.is_ok())
}
