#![allow(mixed_script_confusables, non_snake_case)]
//! Oh-Hey Geo - Spherical-earth math for the proximity core
//!
//! - Haversine great-circle distance
//! - Initial bearing
//! - Projection of a remote fix into the local scene plane
//! - Small-offset destination points (north/east meters)
//!
//! All angles are radians internally; public inputs are degrees.

pub mod distance;
pub mod bearing;
pub mod projection;

pub use distance::*;
pub use bearing::*;
pub use projection::*;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Proximity radius in meters (inclusive)
pub const MAX_DISTANCE_M: f64 = 15.0;

/// Scene units per meter of ground distance
pub const SCENE_UNITS_PER_METER: f64 = 0.2;
