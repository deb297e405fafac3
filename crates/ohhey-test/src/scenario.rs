//! Scenario builder
//!
//! Places peers on a shared `MemoryPresenceStore` by meters north and east
//! of an anchor coordinate. Each peer publishes through its own connection
//! with an auto-remove registration, the way a real client does.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ohhey_core::{
    GeoCoord, GeoPosition, OhHeyResult, StoredPosition, StoredPresence, Timestamp, UserId,
};
use ohhey_geo::offset_by_meters;
use ohhey_presence::{MemoryPresenceStore, PresenceConnection, PresenceStore};

/// A populated presence store around an anchor
pub struct Scenario {
    anchor: GeoCoord,
    store: MemoryPresenceStore,
    peers: Vec<(UserId, PresenceConnection)>,
}

impl Scenario {
    pub fn new(anchor: GeoCoord) -> Self {
        Scenario {
            anchor,
            store: MemoryPresenceStore::new(),
            peers: Vec::new(),
        }
    }

    pub fn anchor(&self) -> GeoCoord {
        self.anchor
    }

    pub fn store(&self) -> &MemoryPresenceStore {
        &self.store
    }

    /// A fresh connection, e.g. for the client under test
    pub fn connect(&self) -> PresenceConnection {
        self.store.connect()
    }

    /// Fix displaced from the anchor
    pub fn position_for(&self, north_m: f64, east_m: f64) -> GeoPosition {
        let coord = offset_by_meters(self.anchor, north_m, east_m);
        GeoPosition::new(coord.latitude, coord.longitude, 5.0, Timestamp::now())
    }

    /// Publish a peer at an offset from the anchor
    pub async fn place(
        &mut self,
        id: &str,
        north_m: f64,
        east_m: f64,
    ) -> OhHeyResult<GeoPosition> {
        let position = self.position_for(north_m, east_m);
        self.publish(UserId::new(id), position).await?;
        Ok(position)
    }

    /// Publish a peer at an absolute coordinate
    pub async fn place_at(&mut self, id: &str, coord: GeoCoord) -> OhHeyResult<GeoPosition> {
        let position = GeoPosition::new(coord.latitude, coord.longitude, 5.0, Timestamp::now());
        self.publish(UserId::new(id), position).await?;
        Ok(position)
    }

    /// Republish an existing peer at a new offset
    pub async fn move_peer(
        &mut self,
        id: &str,
        north_m: f64,
        east_m: f64,
    ) -> OhHeyResult<GeoPosition> {
        self.place(id, north_m, east_m).await
    }

    /// Close a peer's connection. Returns false for unknown peers.
    pub fn disconnect(&mut self, id: &str) -> bool {
        let user = UserId::new(id);
        let Some(index) = self.peers.iter().position(|(peer, _)| *peer == user) else {
            return false;
        };
        let (_, connection) = self.peers.remove(index);
        connection.disconnect();
        true
    }

    /// Write a record with no latitude, as a partially written document
    pub fn put_malformed(&self, id: &str) {
        let doc = StoredPresence {
            position: Some(StoredPosition {
                latitude: None,
                longitude: Some(self.anchor.longitude),
                accuracy: None,
                timestamp: None,
            }),
            last_updated: Some(Timestamp::now()),
        };
        self.store.put_raw(UserId::new(id), doc);
    }

    /// Scatter `count` peers uniformly over a square of half-side
    /// `radius_m` around the anchor. Deterministic for a given seed.
    pub async fn crowd(
        &mut self,
        count: usize,
        radius_m: f64,
        seed: u64,
    ) -> OhHeyResult<Vec<(UserId, GeoCoord)>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let spread = Uniform::new_inclusive(-radius_m, radius_m);

        let mut placed = Vec::with_capacity(count);
        for i in 0..count {
            let north = spread.sample(&mut rng);
            let east = spread.sample(&mut rng);
            let id = format!("peer-{:05}", i);
            let position = self.place(&id, north, east).await?;
            placed.push((UserId::new(id), position.coord()));
        }
        Ok(placed)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    async fn publish(&mut self, user: UserId, position: GeoPosition) -> OhHeyResult<()> {
        if let Some((_, connection)) = self.peers.iter().find(|(peer, _)| *peer == user) {
            return connection.set(&user, &position).await;
        }

        let connection = self.store.connect();
        connection.set(&user, &position).await?;
        connection.register_auto_remove_on_disconnect(&user).await?;
        tracing::debug!(user = %user, "peer placed");
        self.peers.push((user, connection));
        Ok(())
    }
}
