//! Geographic positions

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// A latitude/longitude pair in degrees (WGS84)
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoCoord {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoord {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoCoord {
            latitude,
            longitude,
        }
    }

    /// Check that both components are finite and inside the WGS84 ranges.
    /// Returns the reason for rejection otherwise.
    pub fn check(&self) -> Result<(), &'static str> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err("non-finite coordinate");
        }
        if self.latitude.abs() > 90.0 {
            return Err("latitude out of range");
        }
        if self.longitude.abs() > 180.0 {
            return Err("longitude out of range");
        }
        Ok(())
    }
}

/// A single sensor fix. Superseded by the next fix, never mutated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Degrees north
    pub latitude: f64,
    /// Degrees east
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: f64,
    /// When the fix was taken
    pub timestamp: Timestamp,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: Timestamp) -> Self {
        GeoPosition {
            latitude,
            longitude,
            accuracy,
            timestamp,
        }
    }

    /// Fix at the given coordinate with perfect accuracy, stamped now
    pub fn at(latitude: f64, longitude: f64) -> Self {
        GeoPosition::new(latitude, longitude, 0.0, Timestamp::now())
    }

    #[inline]
    pub fn coord(&self) -> GeoCoord {
        GeoCoord::new(self.latitude, self.longitude)
    }
}

impl From<GeoPosition> for GeoCoord {
    fn from(position: GeoPosition) -> Self {
        position.coord()
    }
}
