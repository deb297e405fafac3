//! Initial bearing

use ohhey_core::GeoCoord;

/// Initial great-circle bearing from `from` to `to`, in radians.
///
/// 0 is north, positive clockwise, range (-π, π].
pub fn initial_bearing(from: GeoCoord, to: GeoCoord) -> f64 {
    let φ1 = from.latitude.to_radians();
    let φ2 = to.latitude.to_radians();
    let Δλ = (to.longitude - from.longitude).to_radians();

    let y = Δλ.sin() * φ2.cos();
    let x = φ1.cos() * φ2.sin() - φ1.sin() * φ2.cos() * Δλ.cos();

    y.atan2(x)
}
