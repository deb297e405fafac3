//! Scripted location sensor
//!
//! One-shot requests are answered from a queue (an empty queue hangs, which
//! is how timeouts are exercised). Watch updates are pushed by the test and
//! fanned out to every active watch.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use ohhey_core::{GeoPosition, WatchId};
use ohhey_tracker::{PositionOptions, PositionSensor, PositionWatch, SensorError};

type UpdateSender = mpsc::Sender<Result<GeoPosition, SensorError>>;

/// Watch channel capacity
const WATCH_BUFFER: usize = 64;

/// Test-driven `PositionSensor`
pub struct ScriptedSensor {
    available: AtomicBool,
    requests: Mutex<VecDeque<Result<GeoPosition, SensorError>>>,
    watches: Mutex<HashMap<WatchId, UpdateSender>>,
    next_watch: AtomicU64,
    cleared: AtomicU64,
    last_options: Mutex<Option<PositionOptions>>,
}

impl ScriptedSensor {
    pub fn new() -> Self {
        ScriptedSensor {
            available: AtomicBool::new(true),
            requests: Mutex::new(VecDeque::new()),
            watches: Mutex::new(HashMap::new()),
            next_watch: AtomicU64::new(1),
            cleared: AtomicU64::new(0),
            last_options: Mutex::new(None),
        }
    }

    /// Sensor on a platform without location capability
    pub fn unavailable() -> Self {
        let sensor = Self::new();
        sensor.available.store(false, Ordering::Release);
        sensor
    }

    /// Answer the next one-shot request with this fix
    pub fn queue_fix(&self, position: GeoPosition) {
        self.requests.lock().push_back(Ok(position));
    }

    /// Answer the next one-shot request with this error
    pub fn queue_error(&self, error: SensorError) {
        self.requests.lock().push_back(Err(error));
    }

    /// Deliver a fix to every active watch. Returns how many received it.
    pub fn push_fix(&self, position: GeoPosition) -> usize {
        self.broadcast(Ok(position))
    }

    /// Deliver an error to every active watch
    pub fn push_error(&self, error: SensorError) -> usize {
        self.broadcast(Err(error))
    }

    /// End every watch stream from the platform side, as when the OS
    /// revokes location mid-session. Not counted as a clear.
    pub fn end_all_watches(&self) -> usize {
        let mut watches = self.watches.lock();
        let ended = watches.len();
        watches.clear();
        ended
    }

    pub fn active_watches(&self) -> usize {
        self.watches.lock().len()
    }

    /// Number of `clear_watch` calls for live watches
    pub fn cleared_count(&self) -> u64 {
        self.cleared.load(Ordering::Acquire)
    }

    /// Options passed with the most recent request or watch
    pub fn last_options(&self) -> Option<PositionOptions> {
        self.last_options.lock().clone()
    }

    fn broadcast(&self, update: Result<GeoPosition, SensorError>) -> usize {
        let watches = self.watches.lock();
        watches
            .values()
            .filter(|tx| tx.try_send(update.clone()).is_ok())
            .count()
    }
}

impl Default for ScriptedSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSensor for ScriptedSensor {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    async fn request_position(
        &self,
        options: &PositionOptions,
    ) -> Result<GeoPosition, SensorError> {
        *self.last_options.lock() = Some(options.clone());
        let next = self.requests.lock().pop_front();
        match next {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    fn watch_position(&self, options: &PositionOptions) -> Result<PositionWatch, SensorError> {
        if !self.is_available() {
            return Err(SensorError::Unavailable);
        }
        *self.last_options.lock() = Some(options.clone());

        let id = WatchId::new(self.next_watch.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        self.watches.lock().insert(id, tx);
        Ok(PositionWatch { id, updates: rx })
    }

    fn clear_watch(&self, id: WatchId) {
        if self.watches.lock().remove(&id).is_some() {
            self.cleared.fetch_add(1, Ordering::AcqRel);
        }
    }
}
