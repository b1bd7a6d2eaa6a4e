//! Single-node in-memory ticket registry.
//!
//! [`InMemoryTicketRegistry`] keeps the whole ticket population in a
//! [`parking_lot::RwLock`]-guarded map. It is the registry of choice for a
//! standalone server and for tests; clustered deployments wrap a shared
//! store with [`ReplicatedTicketRegistry`](crate::replicated::ReplicatedTicketRegistry)
//! instead.
//!
//! # Concurrency
//!
//! The map is the one truly shared mutable resource. Each id maps to
//! at-most-one logical ticket; concurrent `add_ticket` calls for the same
//! id are last-write-wins — the core assumes no optimistic concurrency
//! control. Two callers that both `get_ticket` the same id hold two
//! independent copies; correctness relies on the convention that exactly
//! one logical owner mutates-then-writes-back per request. Racing
//! service-ticket grants against the same TGT may both succeed under a
//! count-based policy (the count is checked against the value read, not
//! atomically incremented store-side); that race is accepted, not a bug.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gatekey_ticket::{Ticket, TicketId};
use parking_lot::RwLock;
use tracing::trace;

use crate::error::RegistryResult;
use crate::registry::TicketRegistry;

/// In-memory ticket registry.
///
/// # Cloning
///
/// `InMemoryTicketRegistry` is cheaply cloneable via [`Arc`]; all clones
/// share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryTicketRegistry {
    tickets: Arc<RwLock<HashMap<TicketId, Ticket>>>,
}

impl InMemoryTicketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tickets.read().len()
    }

    /// Whether the registry holds no tickets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tickets.read().is_empty()
    }
}

impl std::fmt::Debug for InMemoryTicketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTicketRegistry").field("len", &self.len()).finish()
    }
}

#[async_trait]
impl TicketRegistry for InMemoryTicketRegistry {
    async fn add_ticket(&self, ticket: Ticket) -> RegistryResult<()> {
        trace!(ticket = %ticket.id(), "storing ticket");
        self.tickets.write().insert(ticket.id().clone(), ticket);
        Ok(())
    }

    async fn get_ticket(&self, id: &TicketId) -> RegistryResult<Option<Ticket>> {
        Ok(self.tickets.read().get(id).cloned())
    }

    async fn delete_single(&self, id: &TicketId) -> RegistryResult<bool> {
        Ok(self.tickets.write().remove(id).is_some())
    }

    async fn tickets(&self) -> RegistryResult<Vec<Ticket>> {
        Ok(self.tickets.read().values().cloned().collect())
    }
}
