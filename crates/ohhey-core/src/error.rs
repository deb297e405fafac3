//! Error types for Oh-Hey

use thiserror::Error;

use crate::UserId;

/// Core Oh-Hey errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OhHeyError {
    // Sensor errors
    #[error("Position unavailable: no location capability")]
    PositionUnavailable,

    #[error("Position request timed out")]
    PositionTimeout,

    #[error("Position permission denied")]
    PositionDenied,

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("No position fix yet")]
    NoPosition,

    // Store errors
    #[error("Snapshot fetch failed: {0}")]
    SnapshotFetchFailed(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Malformed record for {user}: {reason}")]
    MalformedRecord { user: UserId, reason: String },

    // Setup errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for Oh-Hey operations
pub type OhHeyResult<T> = Result<T, OhHeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_names_user() {
        let err = OhHeyError::MalformedRecord {
            user: UserId::new("bob"),
            reason: "missing latitude".into(),
        };
        assert_eq!(err.to_string(), "Malformed record for bob: missing latitude");
    }
}
