//! Arbitrary snapshots resolve without panicking, and the nearby set only
//! ever holds other users inside the radius, once each, sorted by distance.

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use ohhey_core::{GeoPosition, PresenceSnapshot, StoredPosition, StoredPresence, Timestamp, UserId};
use ohhey_geo::MAX_DISTANCE_M;
use ohhey_proximity::compute_nearby;

#[derive(Arbitrary, Debug)]
struct Entry {
    user: u8,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    last_updated: Option<i64>,
}

#[derive(Arbitrary, Debug)]
struct Input {
    latitude: f64,
    longitude: f64,
    entries: Vec<Entry>,
}

fuzz_target!(|input: Input| {
    let local_user = UserId::new("u0");
    let local = GeoPosition::new(input.latitude, input.longitude, 0.0, Timestamp(0));
    if local.coord().check().is_err() {
        return;
    }

    let snapshot: PresenceSnapshot = input
        .entries
        .iter()
        .map(|entry| {
            let doc = StoredPresence {
                position: Some(StoredPosition {
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                    accuracy: entry.accuracy,
                    timestamp: None,
                }),
                last_updated: entry.last_updated.map(Timestamp),
            };
            (UserId::new(format!("u{}", entry.user % 8)), doc)
        })
        .collect();

    let nearby = compute_nearby(&local_user, &local, &snapshot).nearby;

    let mut seen = HashSet::new();
    for user in &nearby {
        assert_ne!(user.user_id, local_user);
        assert!(user.distance <= MAX_DISTANCE_M);
        assert!(seen.insert(user.user_id.clone()));
    }
    assert!(nearby.windows(2).all(|w| w[0].distance <= w[1].distance));
});
