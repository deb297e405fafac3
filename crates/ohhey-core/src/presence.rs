//! Presence records and the nearby-set types derived from them
//!
//! The shared store holds loosely-typed documents (`StoredPresence`) because
//! any client may have written them. They become `PresenceRecord` only after
//! validation; anything that fails is a `MalformedRecord` and gets skipped.

use serde::{Deserialize, Serialize};

use crate::{GeoCoord, GeoPosition, OhHeyError, OhHeyResult, Timestamp, UserId};

/// Position document as stored in the shared presence mapping
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPosition {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Presence document as stored under `locations/<userId>`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPresence {
    pub position: Option<StoredPosition>,
    pub last_updated: Option<Timestamp>,
}

impl StoredPresence {
    /// Document for a local fix, stamped with the server's clock
    pub fn from_position(position: &GeoPosition, last_updated: Timestamp) -> Self {
        StoredPresence {
            position: Some(StoredPosition {
                latitude: Some(position.latitude),
                longitude: Some(position.longitude),
                accuracy: Some(position.accuracy),
                timestamp: Some(position.timestamp.as_millis()),
            }),
            last_updated: Some(last_updated),
        }
    }
}

/// Full contents of the shared mapping at one read.
///
/// Kept as an ordered list so that a racing double write of the same key is
/// representable; consumers resolve duplicates last-write-wins.
pub type PresenceSnapshot = Vec<(UserId, StoredPresence)>;

/// A validated presence record
#[derive(Clone, Debug, PartialEq)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub position: GeoPosition,
    pub last_updated: Timestamp,
}

impl PresenceRecord {
    /// Validate a stored document into a typed record
    pub fn from_stored(user_id: UserId, stored: &StoredPresence) -> OhHeyResult<Self> {
        let malformed = |reason: &str| OhHeyError::MalformedRecord {
            user: user_id.clone(),
            reason: reason.to_string(),
        };

        if user_id.is_empty() {
            return Err(malformed("empty user id"));
        }

        let last_updated = stored.last_updated.ok_or_else(|| malformed("missing lastUpdated"))?;
        let position = stored
            .position
            .as_ref()
            .ok_or_else(|| malformed("missing position"))?;

        let latitude = position
            .latitude
            .ok_or_else(|| malformed("missing latitude"))?;
        let longitude = position
            .longitude
            .ok_or_else(|| malformed("missing longitude"))?;
        GeoCoord::new(latitude, longitude)
            .check()
            .map_err(|reason| malformed(reason))?;

        let accuracy = position.accuracy.unwrap_or(0.0);
        if !accuracy.is_finite() || accuracy < 0.0 {
            return Err(malformed("invalid accuracy"));
        }

        let timestamp = position
            .timestamp
            .map(Timestamp::from_millis)
            .unwrap_or(last_updated);

        Ok(PresenceRecord {
            position: GeoPosition::new(latitude, longitude, accuracy, timestamp),
            user_id,
            last_updated,
        })
    }
}

/// Another user inside the proximity radius. Recomputed every cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct NearbyUser {
    pub user_id: UserId,
    pub position: GeoPosition,
    /// Great-circle distance from the local user in meters
    pub distance: f64,
    pub last_updated: Timestamp,
}

/// Offset in the scene plane, centered on the local user.
/// `x` grows east, `z` grows north.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SceneOffset {
    pub x: f64,
    pub z: f64,
}

impl SceneOffset {
    pub const ORIGIN: SceneOffset = SceneOffset { x: 0.0, z: 0.0 };

    #[inline]
    pub fn new(x: f64, z: f64) -> Self {
        SceneOffset { x, z }
    }
}
