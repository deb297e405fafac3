//! Platform location service interface

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use ohhey_core::{GeoPosition, OhHeyError, WatchId};

/// Request policy for one-shot and continuous fixes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for GPS-grade rather than network-grade fixes
    pub high_accuracy: bool,
    /// Maximum wait for a fix
    pub timeout: Duration,
    /// Oldest cached fix the platform may return; zero means always fresh
    pub max_cache_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        PositionOptions {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_cache_age: Duration::ZERO,
        }
    }
}

/// Failures reported by a location service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("location service unavailable")]
    Unavailable,

    #[error("timed out waiting for a fix")]
    Timeout,

    #[error("location permission denied")]
    Denied,

    #[error("{0}")]
    Other(String),
}

impl From<SensorError> for OhHeyError {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::Unavailable => OhHeyError::PositionUnavailable,
            SensorError::Timeout => OhHeyError::PositionTimeout,
            SensorError::Denied => OhHeyError::PositionDenied,
            SensorError::Other(msg) => OhHeyError::Sensor(msg),
        }
    }
}

/// Stream of updates from an active watch
pub type PositionUpdates = mpsc::Receiver<Result<GeoPosition, SensorError>>;

/// An active watch. The stream ends when the watch is cleared.
#[derive(Debug)]
pub struct PositionWatch {
    pub id: WatchId,
    pub updates: PositionUpdates,
}

/// Device location service
pub trait PositionSensor: Send + Sync + 'static {
    /// Whether the platform has any location capability
    fn is_available(&self) -> bool;

    /// Request a single fix
    fn request_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<GeoPosition, SensorError>> + Send;

    /// Start delivering fixes until the watch is cleared
    fn watch_position(&self, options: &PositionOptions) -> Result<PositionWatch, SensorError>;

    /// Stop a watch. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);
}

impl<T: PositionSensor> PositionSensor for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn request_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<GeoPosition, SensorError>> + Send {
        (**self).request_position(options)
    }

    fn watch_position(&self, options: &PositionOptions) -> Result<PositionWatch, SensorError> {
        (**self).watch_position(options)
    }

    fn clear_watch(&self, id: WatchId) {
        (**self).clear_watch(id)
    }
}
