//! Position tracker
//!
//! Every accepted fix overwrites the stored position, is written to the
//! presence store with an auto-remove registration, and then triggers one
//! resolve cycle against a fresh snapshot. The snapshot may arrive after a
//! newer fix has landed; the cycle then resolves against the newer fix and
//! the next publish corrects anything stale.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use ohhey_core::{GeoPosition, OhHeyError, OhHeyResult, UserId, WatchId};
use ohhey_presence::PresenceStore;
use ohhey_proximity::ProximityResolver;

use crate::{PositionOptions, PositionSensor, PositionUpdates};

/// Tracker statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Fixes accepted from the sensor
    pub fixes: u64,
    /// Successful presence writes
    pub publishes: u64,
    /// Errors delivered on the watch stream
    pub watch_errors: u64,
}

struct Shared<S, P> {
    user_id: UserId,
    sensor: S,
    store: P,
    resolver: Arc<ProximityResolver>,
    options: PositionOptions,
    current: RwLock<Option<GeoPosition>>,
    stats: Mutex<TrackerStats>,
}

impl<S: PositionSensor, P: PresenceStore> Shared<S, P> {
    fn accept(&self, position: GeoPosition) {
        *self.current.write() = Some(position);
        self.stats.lock().fixes += 1;
    }

    async fn publish(&self) -> OhHeyResult<()> {
        let position = (*self.current.read()).ok_or(OhHeyError::NoPosition)?;

        self.store.set(&self.user_id, &position).await?;
        self.store
            .register_auto_remove_on_disconnect(&self.user_id)
            .await?;
        self.stats.lock().publishes += 1;

        self.resolve().await;
        Ok(())
    }

    async fn resolve(&self) {
        match self.store.read_all().await {
            Ok(snapshot) => {
                let local = *self.current.read();
                if let Some(local) = local {
                    self.resolver
                        .resolve_nearby(&self.user_id, &local, &snapshot);
                }
            }
            Err(err) => self.resolver.fetch_failed(&err),
        }
    }

    async fn run_watch(self: Arc<Self>, mut updates: PositionUpdates, active: Arc<AtomicBool>) {
        while let Some(update) = updates.recv().await {
            if !active.load(Ordering::Acquire) {
                break;
            }

            match update {
                Ok(position) => {
                    self.accept(position);
                    if let Err(err) = self.publish().await {
                        tracing::warn!(user = %self.user_id, error = %err, "publish failed");
                    }
                }
                Err(err) => {
                    self.stats.lock().watch_errors += 1;
                    tracing::warn!(user = %self.user_id, error = %err, "position watch error");
                }
            }
        }
        tracing::debug!(user = %self.user_id, "position watch ended");
    }
}

/// Releases the platform watch. Captured at start so that `Drop` does not
/// need the sensor bounds.
type ClearWatch = Box<dyn FnOnce() + Send>;

struct ActiveWatch {
    id: WatchId,
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
    clear: ClearWatch,
}

impl ActiveWatch {
    /// False once the update stream has ended on the sensor side
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    fn release(self) {
        self.active.store(false, Ordering::Release);
        (self.clear)();
        self.task.abort();
    }
}

/// Owns the local user's position and keeps their presence record in sync
pub struct PositionTracker<S, P> {
    shared: Arc<Shared<S, P>>,
    watch: Mutex<Option<ActiveWatch>>,
}

impl<S: PositionSensor, P: PresenceStore> PositionTracker<S, P> {
    pub fn new(
        user_id: UserId,
        sensor: S,
        store: P,
        resolver: Arc<ProximityResolver>,
        options: PositionOptions,
    ) -> Self {
        PositionTracker {
            shared: Arc::new(Shared {
                user_id,
                sensor,
                store,
                resolver,
                options,
                current: RwLock::new(None),
                stats: Mutex::new(TrackerStats::default()),
            }),
            watch: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.shared.user_id
    }

    pub fn resolver(&self) -> &Arc<ProximityResolver> {
        &self.shared.resolver
    }

    pub fn sensor(&self) -> &S {
        &self.shared.sensor
    }

    pub fn store(&self) -> &P {
        &self.shared.store
    }

    /// The freshest accepted fix
    pub fn current_position(&self) -> Option<GeoPosition> {
        *self.shared.current.read()
    }

    pub fn stats(&self) -> TrackerStats {
        self.shared.stats.lock().clone()
    }

    pub fn is_tracking(&self) -> bool {
        self.watch.lock().as_ref().is_some_and(ActiveWatch::is_running)
    }

    /// Take one fix, store it, and publish it.
    ///
    /// A failed publish is logged but does not fail the acquisition; the
    /// fix is kept and the next publish retries.
    pub async fn acquire_initial_position(&self) -> OhHeyResult<GeoPosition> {
        let shared = &self.shared;
        if !shared.sensor.is_available() {
            return Err(OhHeyError::PositionUnavailable);
        }

        let request = shared.sensor.request_position(&shared.options);
        let position = tokio::time::timeout(shared.options.timeout, request)
            .await
            .map_err(|_| OhHeyError::PositionTimeout)??;

        shared.accept(position);
        tracing::info!(
            user = %shared.user_id,
            accuracy_m = position.accuracy,
            "initial position acquired"
        );

        if let Err(err) = shared.publish().await {
            tracing::warn!(user = %shared.user_id, error = %err, "initial publish failed");
        }
        Ok(position)
    }

    /// Start republishing on every sensor update. No-op if already tracking.
    /// A watch whose stream the sensor has ended is replaced.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_continuous_tracking(&self) -> OhHeyResult<()> {
        let mut slot = self.watch.lock();
        if slot.as_ref().is_some_and(ActiveWatch::is_running) {
            return Ok(());
        }
        if let Some(ended) = slot.take() {
            tracing::debug!(user = %self.shared.user_id, watch = ?ended.id, "replacing ended watch");
            ended.release();
        }

        let shared = &self.shared;
        if !shared.sensor.is_available() {
            return Err(OhHeyError::PositionUnavailable);
        }
        let watch = shared.sensor.watch_position(&shared.options)?;

        let active = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(Arc::clone(shared).run_watch(watch.updates, Arc::clone(&active)));
        let owner = Arc::clone(shared);
        let id = watch.id;

        *slot = Some(ActiveWatch {
            id,
            active,
            task,
            clear: Box::new(move || owner.sensor.clear_watch(id)),
        });
        tracing::info!(user = %shared.user_id, watch = ?watch.id, "continuous tracking started");
        Ok(())
    }

    /// Stop tracking. Safe to call when not tracking.
    pub fn stop_continuous_tracking(&self) {
        let Some(watch) = self.watch.lock().take() else {
            return;
        };

        let id = watch.id;
        watch.release();
        tracing::info!(user = %self.shared.user_id, watch = ?id, "continuous tracking stopped");
    }

    /// Write the current fix and run a resolve cycle
    pub async fn publish(&self) -> OhHeyResult<()> {
        self.shared.publish().await
    }
}

impl<S, P> Drop for PositionTracker<S, P> {
    fn drop(&mut self) {
        if let Some(watch) = self.watch.get_mut().take() {
            watch.release();
        }
    }
}

impl<S, P> fmt::Debug for PositionTracker<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionTracker")
            .field("user_id", &self.shared.user_id)
            .field("position", &*self.shared.current.read())
            .field(
                "tracking",
                &self.watch.lock().as_ref().is_some_and(ActiveWatch::is_running),
            )
            .finish()
    }
}
