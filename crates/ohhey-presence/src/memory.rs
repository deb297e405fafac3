//! In-process presence backend
//!
//! `MemoryPresenceStore` plays the hosted realtime database: one shared
//! mapping, many client connections. Each connection remembers which keys
//! it asked to have removed on disconnect, and removes them when it is
//! disconnected or dropped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use ohhey_core::{
    ConnectionId, GeoPosition, OhHeyError, OhHeyResult, PresenceSnapshot, StoredPresence,
    Timestamp, UserId,
};

use crate::PresenceStore;

/// Server clock used to stamp `lastUpdated`
pub type ServerClock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

struct Shared {
    /// The `locations` mapping
    records: RwLock<HashMap<UserId, StoredPresence>>,
    /// Keys to drop per connection
    on_disconnect: Mutex<HashMap<ConnectionId, HashSet<UserId>>>,
    next_connection: AtomicU64,
    clock: ServerClock,
}

impl Shared {
    fn snapshot(&self) -> PresenceSnapshot {
        let mut snapshot: PresenceSnapshot = self
            .records
            .read()
            .iter()
            .map(|(user, doc)| (user.clone(), doc.clone()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }
}

/// Shared in-process presence mapping
#[derive(Clone)]
pub struct MemoryPresenceStore {
    shared: Arc<Shared>,
}

impl MemoryPresenceStore {
    /// Create an empty store stamping records with the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Timestamp::now))
    }

    /// Create an empty store with a custom server clock
    pub fn with_clock(clock: ServerClock) -> Self {
        MemoryPresenceStore {
            shared: Arc::new(Shared {
                records: RwLock::new(HashMap::new()),
                on_disconnect: Mutex::new(HashMap::new()),
                next_connection: AtomicU64::new(1),
                clock,
            }),
        }
    }

    /// Open a client connection
    pub fn connect(&self) -> PresenceConnection {
        let id = ConnectionId::new(self.shared.next_connection.fetch_add(1, Ordering::Relaxed));
        self.shared.on_disconnect.lock().insert(id, HashSet::new());
        tracing::debug!(connection = ?id, "presence connection opened");

        PresenceConnection {
            id,
            shared: Arc::clone(&self.shared),
            open: AtomicBool::new(true),
        }
    }

    /// Write a raw document, bypassing validation and the server clock
    pub fn put_raw(&self, user: UserId, doc: StoredPresence) {
        self.shared.records.write().insert(user, doc);
    }

    /// Get the document stored for a user
    pub fn get(&self, user: &UserId) -> Option<StoredPresence> {
        self.shared.records.read().get(user).cloned()
    }

    /// Remove a document
    pub fn remove(&self, user: &UserId) -> Option<StoredPresence> {
        self.shared.records.write().remove(user)
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.shared.records.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.shared.records.read().is_empty()
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.shared.on_disconnect.lock().len()
    }

    /// Snapshot ordered by user id
    pub fn snapshot(&self) -> PresenceSnapshot {
        self.shared.snapshot()
    }
}

impl Default for MemoryPresenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryPresenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPresenceStore")
            .field("records", &self.len())
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// One client's connection to a `MemoryPresenceStore`
pub struct PresenceConnection {
    id: ConnectionId,
    shared: Arc<Shared>,
    open: AtomicBool,
}

impl PresenceConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the connection and run its auto-remove registrations.
    /// Safe to call more than once.
    pub fn disconnect(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }

        let registered = self
            .shared
            .on_disconnect
            .lock()
            .remove(&self.id)
            .unwrap_or_default();

        let mut records = self.shared.records.write();
        for user in &registered {
            records.remove(user);
        }
        tracing::debug!(
            connection = ?self.id,
            removed = registered.len(),
            "presence connection closed"
        );
    }

    fn ensure_open(&self) -> OhHeyResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(OhHeyError::PublishFailed("connection closed".into()))
        }
    }
}

impl PresenceStore for PresenceConnection {
    async fn set(&self, user: &UserId, position: &GeoPosition) -> OhHeyResult<()> {
        self.ensure_open()?;
        let doc = StoredPresence::from_position(position, (self.shared.clock)());
        self.shared.records.write().insert(user.clone(), doc);
        Ok(())
    }

    async fn register_auto_remove_on_disconnect(&self, user: &UserId) -> OhHeyResult<()> {
        self.ensure_open()?;
        self.shared
            .on_disconnect
            .lock()
            .entry(self.id)
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    async fn read_all(&self) -> OhHeyResult<PresenceSnapshot> {
        if !self.is_open() {
            return Err(OhHeyError::SnapshotFetchFailed("connection closed".into()));
        }
        Ok(self.shared.snapshot())
    }
}

impl Drop for PresenceConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for PresenceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceConnection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}
