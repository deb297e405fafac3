//! Client configuration
//!
//! Loaded from JSON. Durations are humantime strings (`"10s"`, `"250ms"`).
//!
//! ```json
//! {
//!   "userId": "u-123",
//!   "tracking": { "highAccuracy": true, "timeout": "10s", "maxCacheAge": "0s" },
//!   "log": { "filter": "ohhey=debug", "json": true }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ohhey_core::{OhHeyError, OhHeyResult, UserId};
use ohhey_tracker::PositionOptions;

/// Sensor request policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackingConfig {
    pub high_accuracy: bool,
    #[serde(with = "humantime_serde_str")]
    pub timeout: Duration,
    #[serde(with = "humantime_serde_str")]
    pub max_cache_age: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        let options = PositionOptions::default();
        TrackingConfig {
            high_accuracy: options.high_accuracy,
            timeout: options.timeout,
            max_cache_age: options.max_cache_age,
        }
    }
}

impl From<&TrackingConfig> for PositionOptions {
    fn from(config: &TrackingConfig) -> Self {
        PositionOptions {
            high_accuracy: config.high_accuracy,
            timeout: config.timeout,
            max_cache_age: config.max_cache_age,
        }
    }
}

/// Logging setup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Client configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Id issued by the auth backend
    pub user_id: UserId,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl ClientConfig {
    /// Defaults for everything but the user id
    pub fn new(user_id: UserId) -> Self {
        ClientConfig {
            user_id,
            tracking: TrackingConfig::default(),
            log: LogConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> OhHeyResult<Self> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| OhHeyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> OhHeyResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| OhHeyError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> OhHeyResult<()> {
        if self.user_id.is_empty() {
            return Err(OhHeyError::Config("userId must not be empty".into()));
        }
        if self.tracking.timeout.is_zero() {
            return Err(OhHeyError::Config("tracking.timeout must be positive".into()));
        }
        Ok(())
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions::from(&self.tracking)
    }
}

mod humantime_serde_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
