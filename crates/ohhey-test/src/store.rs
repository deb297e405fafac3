//! Store wrapper with fault injection and call counting

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use ohhey_core::{GeoPosition, OhHeyError, OhHeyResult, PresenceSnapshot, UserId};
use ohhey_presence::PresenceStore;

/// Call counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub sets: u64,
    pub registrations: u64,
    pub reads: u64,
}

/// Wraps a real store. Reads and writes can be made to fail, reads can be
/// delayed, and extra raw entries can be appended to every snapshot to
/// simulate racing writers.
pub struct InstrumentedStore<P> {
    inner: P,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    read_delay: Mutex<Duration>,
    extra_entries: Mutex<PresenceSnapshot>,
    sets: AtomicU64,
    registrations: AtomicU64,
    reads: AtomicU64,
}

impl<P: PresenceStore> InstrumentedStore<P> {
    pub fn new(inner: P) -> Self {
        InstrumentedStore {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            read_delay: Mutex::new(Duration::ZERO),
            extra_entries: Mutex::new(Vec::new()),
            sets: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            reads: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock() = delay;
    }

    /// Append these entries after the real ones on every read
    pub fn append_to_reads(&self, entries: PresenceSnapshot) {
        self.extra_entries.lock().extend(entries);
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            sets: self.sets.load(Ordering::Acquire),
            registrations: self.registrations.load(Ordering::Acquire),
            reads: self.reads.load(Ordering::Acquire),
        }
    }
}

impl<P: PresenceStore> PresenceStore for InstrumentedStore<P> {
    async fn set(&self, user: &UserId, position: &GeoPosition) -> OhHeyResult<()> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(OhHeyError::PublishFailed("injected write failure".into()));
        }
        self.inner.set(user, position).await?;
        self.sets.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn register_auto_remove_on_disconnect(&self, user: &UserId) -> OhHeyResult<()> {
        self.inner.register_auto_remove_on_disconnect(user).await?;
        self.registrations.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn read_all(&self) -> OhHeyResult<PresenceSnapshot> {
        self.reads.fetch_add(1, Ordering::AcqRel);

        let delay = *self.read_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(OhHeyError::SnapshotFetchFailed("injected read failure".into()));
        }

        let mut snapshot = self.inner.read_all().await?;
        snapshot.extend(self.extra_entries.lock().iter().cloned());
        Ok(snapshot)
    }
}
