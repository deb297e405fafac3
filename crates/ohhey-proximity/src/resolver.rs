//! Nearby-set resolution
//!
//! One resolve cycle:
//! 1. Dedup the snapshot by user id, last write wins
//! 2. Drop the local user's own record
//! 3. Validate each record, skipping malformed ones
//! 4. Keep records within `MAX_DISTANCE_M` of the local fix
//! 5. Replace the stored nearby set and notify every subscriber
//!
//! Subscribers always receive the complete set, never a diff.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use ohhey_core::{
    GeoPosition, NearbyUser, OhHeyError, PresenceRecord, PresenceSnapshot, SubscriptionId, UserId,
};
use ohhey_geo::{haversine_distance, is_within_range};

/// Callback receiving the nearby set once per cycle
pub type NearbyCallback = Arc<dyn Fn(&[NearbyUser]) + Send + Sync>;

/// Output of the pure filtering step
#[derive(Debug, Default)]
pub struct Resolution {
    /// Nearby users, ascending by distance then id
    pub nearby: Vec<NearbyUser>,
    /// Records dropped as malformed
    pub skipped: u32,
}

/// Filter a snapshot down to the users near `local`.
///
/// Does not touch resolver state or notify anyone.
pub fn compute_nearby(
    local_user: &UserId,
    local: &GeoPosition,
    snapshot: &PresenceSnapshot,
) -> Resolution {
    let mut latest: HashMap<&UserId, usize> = HashMap::with_capacity(snapshot.len());
    for (index, (user, _)) in snapshot.iter().enumerate() {
        latest.insert(user, index);
    }

    let mut resolution = Resolution::default();
    for (user, index) in latest {
        if user == local_user {
            continue;
        }

        let record = match PresenceRecord::from_stored(user.clone(), &snapshot[index].1) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(user = %user, error = %err, "skipping presence record");
                resolution.skipped += 1;
                continue;
            }
        };

        let distance = haversine_distance(local.coord(), record.position.coord());
        if is_within_range(distance) {
            resolution.nearby.push(NearbyUser {
                user_id: record.user_id,
                position: record.position,
                distance,
                last_updated: record.last_updated,
            });
        }
    }

    resolution.nearby.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    resolution
}

/// Resolver statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Completed resolve cycles
    pub cycles: u64,
    /// Cycles skipped because the snapshot could not be fetched
    pub failed_fetches: u64,
    /// Malformed records skipped across all cycles
    pub skipped_records: u64,
    /// Size of the most recent nearby set
    pub last_nearby: usize,
}

/// Owns the current nearby set and its subscribers
pub struct ProximityResolver {
    subscribers: Mutex<Vec<(SubscriptionId, NearbyCallback)>>,
    next_subscription: AtomicU64,
    nearby: RwLock<Vec<NearbyUser>>,
    stats: Mutex<ResolverStats>,
}

impl ProximityResolver {
    pub fn new() -> Self {
        ProximityResolver {
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            nearby: RwLock::new(Vec::new()),
            stats: Mutex::new(ResolverStats::default()),
        }
    }

    /// Register a callback for every future cycle
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[NearbyUser]) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Run one cycle against a fresh snapshot and notify subscribers.
    /// Returns the delivered set.
    pub fn resolve_nearby(
        &self,
        local_user: &UserId,
        local: &GeoPosition,
        snapshot: &PresenceSnapshot,
    ) -> Vec<NearbyUser> {
        let Resolution { nearby, skipped } = compute_nearby(local_user, local, snapshot);

        *self.nearby.write() = nearby.clone();
        {
            let mut stats = self.stats.lock();
            stats.cycles += 1;
            stats.skipped_records += skipped as u64;
            stats.last_nearby = nearby.len();
        }
        tracing::debug!(
            records = snapshot.len(),
            nearby = nearby.len(),
            skipped,
            "resolved nearby set"
        );

        self.notify(&nearby);
        nearby
    }

    /// Record a cycle that could not run. The previous set stays in place.
    pub fn fetch_failed(&self, error: &OhHeyError) {
        self.stats.lock().failed_fetches += 1;
        tracing::warn!(error = %error, "presence snapshot unavailable, skipping cycle");
    }

    /// The most recently delivered nearby set
    pub fn nearby(&self) -> Vec<NearbyUser> {
        self.nearby.read().clone()
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats.lock().clone()
    }

    fn notify(&self, nearby: &[NearbyUser]) {
        // Callbacks run without the lock held so they may (un)subscribe
        let callbacks: Vec<NearbyCallback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(nearby);
        }
    }
}

impl Default for ProximityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProximityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProximityResolver")
            .field("subscribers", &self.subscriber_count())
            .field("stats", &self.stats())
            .finish()
    }
}
