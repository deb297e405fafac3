//! Projection of geographic fixes into the local scene plane

use ohhey_core::{GeoCoord, SceneOffset};

use crate::{haversine_distance, initial_bearing, SCENE_UNITS_PER_METER};

/// Place `target` in a plane centered on `local`.
///
/// Polar projection: the haversine distance, scaled to scene units, laid
/// along the initial bearing. Pure and stateless, so identical inputs give
/// bit-identical output.
pub fn project_to_scene(local: GeoCoord, target: GeoCoord) -> SceneOffset {
    let scaled = haversine_distance(local, target) * SCENE_UNITS_PER_METER;
    let θ = initial_bearing(local, target);

    SceneOffset::new(scaled * θ.sin(), scaled * θ.cos())
}
