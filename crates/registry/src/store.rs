//! Byte-level backing-store contract for replicated registries.
//!
//! A [`TicketStore`] is what a concrete backing-store adapter (replicated
//! cache, RDBMS, ...) implements: opaque bytes keyed by ticket id. The
//! [`ReplicatedTicketRegistry`](crate::replicated::ReplicatedTicketRegistry)
//! layers the serialization codec and re-linking on top, so adapters never
//! see ticket internals.
//!
//! Adapters map their transport failures to
//! [`RegistryError::StoreUnavailable`](crate::error::RegistryError::StoreUnavailable);
//! the core treats that as fatal for the request and never retries.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use gatekey_ticket::TicketId;
use parking_lot::RwLock;

use crate::error::RegistryResult;

/// Opaque byte storage keyed by ticket id.
///
/// Implementations must be thread-safe and tolerate concurrent operations.
/// Writes for the same id are last-write-wins.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Stores the serialized form of a ticket, overwriting any previous
    /// value under the same id.
    async fn put(&self, id: &TicketId, bytes: Vec<u8>) -> RegistryResult<()>;

    /// Fetches the serialized form of a ticket, `None` when absent.
    async fn fetch(&self, id: &TicketId) -> RegistryResult<Option<Bytes>>;

    /// Removes an entry; returns whether one was actually removed.
    async fn remove(&self, id: &TicketId) -> RegistryResult<bool>;

    /// Returns the serialized form of every stored entry. A point-in-time
    /// snapshot, like [`TicketRegistry::tickets`](crate::registry::TicketRegistry::tickets).
    async fn scan(&self) -> RegistryResult<Vec<Bytes>>;
}

/// In-process [`TicketStore`] shared by every clone.
///
/// Stands in for a replicated cache in tests and single-host deployments:
/// several [`ReplicatedTicketRegistry`](crate::replicated::ReplicatedTicketRegistry)
/// instances constructed over clones of one `SharedMemoryTicketStore`
/// behave like cluster nodes over one backing store.
#[derive(Clone, Default)]
pub struct SharedMemoryTicketStore {
    entries: Arc<RwLock<HashMap<TicketId, Bytes>>>,
}

impl SharedMemoryTicketStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl TicketStore for SharedMemoryTicketStore {
    async fn put(&self, id: &TicketId, bytes: Vec<u8>) -> RegistryResult<()> {
        self.entries.write().insert(id.clone(), Bytes::from(bytes));
        Ok(())
    }

    async fn fetch(&self, id: &TicketId) -> RegistryResult<Option<Bytes>> {
        Ok(self.entries.read().get(id).cloned())
    }

    async fn remove(&self, id: &TicketId) -> RegistryResult<bool> {
        Ok(self.entries.write().remove(id).is_some())
    }

    async fn scan(&self) -> RegistryResult<Vec<Bytes>> {
        Ok(self.entries.read().values().cloned().collect())
    }
}
