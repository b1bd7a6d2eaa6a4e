//! Replicated ticket registry over a shared backing store.
//!
//! [`ReplicatedTicketRegistry`] implements [`TicketRegistry`] by running
//! the [codec](crate::codec) over a [`TicketStore`]. Several registry
//! instances constructed over the same store — one per cluster node — see
//! each other's writes, which is what gives a multi-node deployment its
//! single logical ticket population.
//!
//! Two concerns a single-node registry does not have:
//!
//! 1. **Write propagation.** A caller that mutates its copy of a ticket
//!    (granting, expiring) must push the new serialized form back with
//!    [`update_ticket`](ReplicatedTicketRegistry::update_ticket). The
//!    injected [`UpdatePropagation`] strategy lets adapters whose store
//!    applies mutations natively (e.g. a row update) opt out of
//!    whole-object replacement.
//! 2. **Re-linking on read.** A ticket deserialized from a shared store
//!    has no in-memory identity; a service ticket's parent reference is an
//!    id, and
//!    [`proxied_ticket_instance`](ReplicatedTicketRegistry::proxied_ticket_instance)
//!    resolves it against the registry to a live instance rather than any
//!    stale embedded copy.
//!
//! Store failures surface as
//! [`RegistryError::StoreUnavailable`](crate::error::RegistryError::StoreUnavailable);
//! this decorator never retries — retry policy belongs to the backing-store
//! adapter.

use async_trait::async_trait;
use gatekey_ticket::{ServiceTicket, Ticket, TicketError, TicketGrantingTicket, TicketId};
use tracing::{debug, trace};

use crate::codec::{decode_ticket, encode_ticket};
use crate::error::{RegistryError, RegistryResult};
use crate::registry::TicketRegistry;
use crate::store::TicketStore;

/// How mutations made through this registry reach the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePropagation {
    /// The store holds opaque serialized tickets (replicated cache style);
    /// every mutation requires a whole-object write-back through
    /// [`ReplicatedTicketRegistry::update_ticket`].
    WriteThrough,
    /// The store applies mutations natively (RDBMS row update style);
    /// `update_ticket` is a no-op.
    StoreManaged,
}

/// Registry decorator that replicates tickets through a [`TicketStore`].
#[derive(Clone)]
pub struct ReplicatedTicketRegistry<S> {
    store: S,
    propagation: UpdatePropagation,
}

impl<S: TicketStore> ReplicatedTicketRegistry<S> {
    /// Creates a registry over `store` with the given propagation strategy.
    #[must_use]
    pub fn new(store: S, propagation: UpdatePropagation) -> Self {
        Self { store, propagation }
    }

    /// Returns a reference to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether mutations require an explicit
    /// [`update_ticket`](Self::update_ticket) write-back.
    #[must_use]
    pub fn needs_write_back(&self) -> bool {
        self.propagation == UpdatePropagation::WriteThrough
    }

    /// Propagates a mutated ticket's current state to the backing store.
    ///
    /// Under [`UpdatePropagation::StoreManaged`] this is a no-op: the store
    /// has already seen the mutation through its own channel.
    ///
    /// # Errors
    ///
    /// Serialization or store failures, as for
    /// [`add_ticket`](TicketRegistry::add_ticket).
    pub async fn update_ticket(&self, ticket: &Ticket) -> RegistryResult<()> {
        if !self.needs_write_back() {
            trace!(ticket = %ticket.id(), "store manages its own updates, skipping write-back");
            return Ok(());
        }
        debug!(ticket = %ticket.id(), "propagating ticket update");
        self.store.put(ticket.id(), encode_ticket(ticket)?).await
    }

    /// Resolves a service ticket's parent reference to the live instance
    /// stored in the registry.
    ///
    /// A deserialized service ticket carries only its parent's id; this is
    /// the re-linking step that restores referential consistency after a
    /// ticket graph crosses the store.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] — the parent has been evicted.
    /// - [`RegistryError::Expired`] — the parent exists but is expired; an
    ///   expired parent is never handed out as a live instance.
    /// - [`RegistryError::Ticket`] — the reference resolves to something
    ///   other than a ticket-granting ticket (a corrupt graph).
    pub async fn proxied_ticket_instance(
        &self,
        ticket: &ServiceTicket,
    ) -> RegistryResult<TicketGrantingTicket> {
        let parent_id = ticket.granting_ticket();
        let Some(parent) = self.get_ticket(parent_id).await? else {
            return Err(RegistryError::not_found(parent_id.clone()));
        };

        match parent {
            Ticket::TicketGranting(granting) => {
                if granting.is_expired() {
                    return Err(RegistryError::expired(parent_id.clone()));
                }
                Ok(granting)
            }
            Ticket::Service(_) => Err(RegistryError::Ticket(TicketError::illegal_state(
                parent_id.clone(),
                "granting-ticket reference resolves to a service ticket",
            ))),
        }
    }
}

impl<S> std::fmt::Debug for ReplicatedTicketRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedTicketRegistry")
            .field("propagation", &self.propagation)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: TicketStore> TicketRegistry for ReplicatedTicketRegistry<S> {
    async fn add_ticket(&self, ticket: Ticket) -> RegistryResult<()> {
        trace!(ticket = %ticket.id(), "replicating ticket");
        self.store.put(ticket.id(), encode_ticket(&ticket)?).await
    }

    async fn get_ticket(&self, id: &TicketId) -> RegistryResult<Option<Ticket>> {
        match self.store.fetch(id).await? {
            Some(bytes) => Ok(Some(decode_ticket(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn delete_single(&self, id: &TicketId) -> RegistryResult<bool> {
        self.store.remove(id).await
    }

    async fn tickets(&self) -> RegistryResult<Vec<Ticket>> {
        let entries = self.store.scan().await?;
        entries.iter().map(|bytes| decode_ticket(bytes)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Utc;
    use gatekey_ticket::{
        Authentication, ExpirationPolicy, Principal, Service, TicketIdGenerator, TicketKind,
    };

    use super::*;
    use crate::store::SharedMemoryTicketStore;

    fn registry() -> ReplicatedTicketRegistry<SharedMemoryTicketStore> {
        ReplicatedTicketRegistry::new(
            SharedMemoryTicketStore::new(),
            UpdatePropagation::WriteThrough,
        )
    }

    fn sample_tgt(generator: &TicketIdGenerator) -> TicketGrantingTicket {
        TicketGrantingTicket::new(
            generator.new_id(TicketKind::TicketGranting),
            Authentication::new(Principal::new("alice"), Utc::now()),
            ExpirationPolicy::Never,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_add_get_roundtrip_through_store() {
        let registry = registry();
        let generator = TicketIdGenerator::new();
        let tgt = sample_tgt(&generator);
        let id = tgt.id().clone();
        let ticket = Ticket::from(tgt);

        registry.add_ticket(ticket.clone()).await.unwrap();
        let fetched = registry.get_ticket(&id).await.unwrap().unwrap();
        assert_eq!(fetched, ticket);
    }

    #[tokio::test]
    async fn test_update_ticket_writes_through() {
        let registry = registry();
        let generator = TicketIdGenerator::new();
        let tgt = sample_tgt(&generator);
        let id = tgt.id().clone();
        registry.add_ticket(tgt.into()).await.unwrap();

        let mut copy = registry.get_ticket(&id).await.unwrap().unwrap();
        copy.expire();
        registry.update_ticket(&copy).await.unwrap();

        assert!(registry.get_ticket(&id).await.unwrap().unwrap().is_expired());
    }

    #[tokio::test]
    async fn test_store_managed_skips_write_back() {
        let registry = ReplicatedTicketRegistry::new(
            SharedMemoryTicketStore::new(),
            UpdatePropagation::StoreManaged,
        );
        assert!(!registry.needs_write_back());

        let generator = TicketIdGenerator::new();
        let tgt = sample_tgt(&generator);
        let id = tgt.id().clone();
        registry.add_ticket(tgt.into()).await.unwrap();

        let mut copy = registry.get_ticket(&id).await.unwrap().unwrap();
        copy.expire();
        registry.update_ticket(&copy).await.unwrap();

        // This in-memory store has no native mutation channel, so the
        // skipped write-back leaves the stored state untouched.
        assert!(!registry.get_ticket(&id).await.unwrap().unwrap().is_expired());
    }

    #[tokio::test]
    async fn test_relink_resolves_live_parent() {
        let registry = registry();
        let generator = TicketIdGenerator::new();
        let mut tgt = sample_tgt(&generator);
        let st = tgt
            .grant_service_ticket(
                generator.new_id(TicketKind::Service),
                Service::new("https://app.example.org/"),
                ExpirationPolicy::Never,
                false,
                Utc::now(),
            )
            .unwrap();
        registry.add_ticket(tgt.clone().into()).await.unwrap();
        registry.add_ticket(st.clone().into()).await.unwrap();

        let parent = registry.proxied_ticket_instance(&st).await.unwrap();
        assert_eq!(parent.id(), tgt.id());
        assert_eq!(parent.core().count_of_uses(), 1, "must be the stored state, not a stub");
    }

    #[tokio::test]
    async fn test_relink_fails_not_found_after_eviction() {
        let registry = registry();
        let generator = TicketIdGenerator::new();
        let mut tgt = sample_tgt(&generator);
        let st = tgt
            .grant_service_ticket(
                generator.new_id(TicketKind::Service),
                Service::new("https://app.example.org/"),
                ExpirationPolicy::Never,
                false,
                Utc::now(),
            )
            .unwrap();
        registry.add_ticket(st.clone().into()).await.unwrap();
        // The parent TGT is never stored.

        let result = registry.proxied_ticket_instance(&st).await;
        assert!(matches!(result, Err(RegistryError::NotFound { .. })), "got {result:?}");
    }

    #[tokio::test]
    async fn test_relink_fails_expired_for_dead_parent() {
        let registry = registry();
        let generator = TicketIdGenerator::new();
        let mut tgt = sample_tgt(&generator);
        let st = tgt
            .grant_service_ticket(
                generator.new_id(TicketKind::Service),
                Service::new("https://app.example.org/"),
                ExpirationPolicy::Never,
                false,
                Utc::now(),
            )
            .unwrap();
        tgt.expire();
        registry.add_ticket(tgt.into()).await.unwrap();
        registry.add_ticket(st.clone().into()).await.unwrap();

        let result = registry.proxied_ticket_instance(&st).await;
        assert!(matches!(result, Err(RegistryError::Expired { .. })), "got {result:?}");
    }
}
