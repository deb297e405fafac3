//! Proximity client - the full presence loop for one local user

use std::fmt;
use std::sync::Arc;

use ohhey_core::{GeoPosition, NearbyUser, OhHeyResult, SubscriptionId, UserId};
use ohhey_presence::PresenceStore;
use ohhey_proximity::{ProximityResolver, RosterDiff, SceneRoster};
use ohhey_tracker::{PositionSensor, PositionTracker, TrackerStats};

use crate::ClientConfig;

/// Owns the tracker and resolver for the local user
pub struct ProximityClient<S, P> {
    tracker: PositionTracker<S, P>,
    resolver: Arc<ProximityResolver>,
}

impl<S: PositionSensor, P: PresenceStore> ProximityClient<S, P> {
    /// Build a client over injected sensor and store handles
    pub fn new(config: &ClientConfig, sensor: S, store: P) -> Self {
        let resolver = Arc::new(ProximityResolver::new());
        let tracker = PositionTracker::new(
            config.user_id.clone(),
            sensor,
            store,
            Arc::clone(&resolver),
            config.position_options(),
        );
        ProximityClient { tracker, resolver }
    }

    pub fn user_id(&self) -> &UserId {
        self.tracker.user_id()
    }

    /// Acquire the first fix, publish it, then track continuously.
    ///
    /// Initial-fix failures are returned and tracking is not started.
    pub async fn start(&self) -> OhHeyResult<GeoPosition> {
        let position = self.tracker.acquire_initial_position().await?;
        self.tracker.start_continuous_tracking()?;
        tracing::info!(user = %self.user_id(), "proximity client started");
        Ok(position)
    }

    /// Stop tracking. Idempotent.
    pub fn shutdown(&self) {
        self.tracker.stop_continuous_tracking();
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&[NearbyUser]) + Send + Sync + 'static,
    {
        self.resolver.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.resolver.unsubscribe(id)
    }

    /// The last delivered nearby set
    pub fn nearby(&self) -> Vec<NearbyUser> {
        self.resolver.nearby()
    }

    /// Bring `roster` in line with the last nearby set, projected from the
    /// current fix. `None` before the first fix.
    pub fn reconcile(&self, roster: &mut SceneRoster) -> Option<RosterDiff> {
        let local = self.tracker.current_position()?;
        Some(roster.reconcile(&local, &self.resolver.nearby()))
    }

    /// A roster for this client's user
    pub fn new_roster(&self) -> SceneRoster {
        SceneRoster::new(self.user_id().clone())
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_tracking()
    }

    pub fn stats(&self) -> TrackerStats {
        self.tracker.stats()
    }

    pub fn tracker(&self) -> &PositionTracker<S, P> {
        &self.tracker
    }

    pub fn resolver(&self) -> &Arc<ProximityResolver> {
        &self.resolver
    }
}

impl<S, P> fmt::Debug for ProximityClient<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProximityClient")
            .field("tracker", &self.tracker)
            .field("resolver", &self.resolver)
            .finish()
    }
}
