//! Great-circle distance

use ohhey_core::GeoCoord;

use crate::{EARTH_RADIUS_M, MAX_DISTANCE_M};

/// Haversine distance between two coordinates in meters
pub fn haversine_distance(from: GeoCoord, to: GeoCoord) -> f64 {
    let φ1 = from.latitude.to_radians();
    let φ2 = to.latitude.to_radians();
    let Δφ = (to.latitude - from.latitude).to_radians();
    let Δλ = (to.longitude - from.longitude).to_radians();

    let a = (Δφ / 2.0).sin() * (Δφ / 2.0).sin()
        + φ1.cos() * φ2.cos() * (Δλ / 2.0).sin() * (Δλ / 2.0).sin();
    // Rounding can push `a` a hair past 1 for near-antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Proximity predicate. The radius is inclusive.
#[inline]
pub fn is_within_range(distance_m: f64) -> bool {
    distance_m <= MAX_DISTANCE_M
}

/// Point displaced from `origin` by the given meters north and east.
///
/// Flat-earth approximation around the origin, accurate to well under a
/// millimeter for offsets in the proximity range. Not valid at the poles.
pub fn offset_by_meters(origin: GeoCoord, north_m: f64, east_m: f64) -> GeoCoord {
    let φ = origin.latitude.to_radians();
    let Δφ = north_m / EARTH_RADIUS_M;
    let Δλ = east_m / (EARTH_RADIUS_M * φ.cos());

    GeoCoord::new(
        origin.latitude + Δφ.to_degrees(),
        origin.longitude + Δλ.to_degrees(),
    )
}
