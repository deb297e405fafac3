//! Presence store interface

use std::future::Future;
use std::sync::Arc;

use ohhey_core::{GeoPosition, OhHeyResult, PresenceSnapshot, UserId};

/// Client handle to the shared presence mapping.
///
/// Implementations are a single client's view: auto-remove registrations
/// belong to the connection they were made on.
pub trait PresenceStore: Send + Sync + 'static {
    /// Overwrite the record for `user`. The store assigns `lastUpdated`.
    fn set(
        &self,
        user: &UserId,
        position: &GeoPosition,
    ) -> impl Future<Output = OhHeyResult<()>> + Send;

    /// Remove the record for `user` when this client disconnects
    fn register_auto_remove_on_disconnect(
        &self,
        user: &UserId,
    ) -> impl Future<Output = OhHeyResult<()>> + Send;

    /// Read every record currently in the mapping
    fn read_all(&self) -> impl Future<Output = OhHeyResult<PresenceSnapshot>> + Send;
}

impl<T: PresenceStore> PresenceStore for Arc<T> {
    fn set(
        &self,
        user: &UserId,
        position: &GeoPosition,
    ) -> impl Future<Output = OhHeyResult<()>> + Send {
        (**self).set(user, position)
    }

    fn register_auto_remove_on_disconnect(
        &self,
        user: &UserId,
    ) -> impl Future<Output = OhHeyResult<()>> + Send {
        (**self).register_auto_remove_on_disconnect(user)
    }

    fn read_all(&self) -> impl Future<Output = OhHeyResult<PresenceSnapshot>> + Send {
        (**self).read_all()
    }
}
