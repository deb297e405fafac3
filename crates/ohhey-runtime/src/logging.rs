//! Logging bootstrap

use tracing_subscriber::EnvFilter;

use ohhey_core::{OhHeyError, OhHeyResult};

use crate::LogConfig;

/// Build the filter: `RUST_LOG` when set, the configured directives otherwise
pub fn env_filter(config: &LogConfig) -> OhHeyResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| OhHeyError::Config(format!("log filter {:?}: {}", config.filter, e))),
    }
}

/// Install the global subscriber.
///
/// Fails with `Config` if the filter does not parse or a subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> OhHeyResult<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| OhHeyError::Config(format!("logging already initialized: {}", e)))
}
