//! The ticket registry contract.
//!
//! A [`TicketRegistry`] is the logical store every issuance and validation
//! request runs against, keyed by ticket id. Implementations must be
//! thread-safe (`Send + Sync`) and tolerate concurrent callers.
//!
//! # Key Operations
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`add_ticket`](TicketRegistry::add_ticket) | Store or overwrite a ticket by id |
//! | [`get_ticket`](TicketRegistry::get_ticket) | Retrieve the caller's mutable copy of a ticket |
//! | [`delete_ticket`](TicketRegistry::delete_ticket) | Remove a ticket and its recorded descendants |
//! | [`delete_single`](TicketRegistry::delete_single) | Remove exactly one entry, no cascade |
//! | [`tickets`](TicketRegistry::tickets) | Point-in-time snapshot of every stored ticket |
//! | [`session_count`](TicketRegistry::session_count) | Number of root SSO sessions |
//! | [`service_ticket_count`](TicketRegistry::service_ticket_count) | Number of service tickets |
//!
//! # Lazy expiry
//!
//! `get_ticket` and `tickets` return expired tickets: expiry is a function
//! of wall-clock time, re-evaluated by callers on every read, and evicted
//! eagerly only by the [`RegistryCleaner`](crate::cleaner::RegistryCleaner).
//! The registry never silently drops an expiration condition.

use std::collections::HashSet;

use async_trait::async_trait;
use gatekey_ticket::{Ticket, TicketId};
use tracing::debug;

use crate::error::RegistryResult;

/// Logical ticket store keyed by ticket id.
///
/// `delete_ticket` is a provided method: it walks the ticket tree recorded
/// on a ticket-granting ticket (granted service tickets and tracked
/// proxy-granting tickets, including nested proxy chains) and removes every
/// descendant before the ticket itself — the fan-out part of a logout.
/// Implementations only supply the single-entry primitive
/// [`delete_single`](Self::delete_single).
#[async_trait]
pub trait TicketRegistry: Send + Sync {
    /// Stores a ticket, overwriting any previous ticket with the same id.
    ///
    /// Makes the ticket's current in-memory state durable for subsequent
    /// [`get_ticket`](Self::get_ticket) calls — including, for a replicated
    /// registry, calls made through another registry instance sharing the
    /// same backing store.
    async fn add_ticket(&self, ticket: Ticket) -> RegistryResult<()>;

    /// Retrieves a ticket by id.
    ///
    /// Returns `Ok(None)` when no ticket is stored under `id`. The returned
    /// ticket is the caller's own mutable copy; mutations are visible to
    /// other callers only after a write-back via
    /// [`add_ticket`](Self::add_ticket).
    async fn get_ticket(&self, id: &TicketId) -> RegistryResult<Option<Ticket>>;

    /// Removes exactly one entry, without cascading.
    ///
    /// Returns whether an entry was actually removed. Idempotent.
    async fn delete_single(&self, id: &TicketId) -> RegistryResult<bool>;

    /// Returns a point-in-time snapshot of every stored ticket.
    ///
    /// The snapshot may be stale relative to concurrent mutations; it is
    /// finite and not restartable as a live cursor.
    async fn tickets(&self) -> RegistryResult<Vec<Ticket>>;

    /// Removes a ticket and every descendant recorded on it.
    ///
    /// For a ticket-granting ticket this walks the whole tree — granted
    /// service tickets, tracked proxy-granting tickets, and the
    /// descendants those proxy tickets recorded in turn — deleting each
    /// before the ticket itself. Idempotent; returns whether the root
    /// ticket was actually removed.
    async fn delete_ticket(&self, id: &TicketId) -> RegistryResult<bool> {
        let Some(ticket) = self.get_ticket(id).await? else {
            debug!(ticket = %id, "delete of absent ticket is a no-op");
            return Ok(false);
        };

        // Walk the recorded descendants iteratively; the visited set guards
        // against a malformed graph arriving from a shared store.
        let mut visited: HashSet<TicketId> = HashSet::new();
        visited.insert(id.clone());
        let mut worklist = ticket.child_ids();

        while let Some(child_id) = worklist.pop() {
            if !visited.insert(child_id.clone()) {
                continue;
            }
            if let Some(child) = self.get_ticket(&child_id).await? {
                worklist.extend(child.child_ids());
            }
            if self.delete_single(&child_id).await? {
                debug!(ticket = %child_id, parent = %id, "removed descendant ticket");
            }
        }

        debug!(ticket = %id, "removing ticket from the registry");
        self.delete_single(id).await
    }

    /// Number of root SSO sessions (root ticket-granting tickets) in the
    /// registry, derived from a snapshot.
    async fn session_count(&self) -> RegistryResult<usize> {
        let tickets = self.tickets().await?;
        Ok(tickets.iter().filter(|ticket| ticket.is_root_granting()).count())
    }

    /// Number of service tickets in the registry, derived from a snapshot.
    async fn service_ticket_count(&self) -> RegistryResult<usize> {
        let tickets = self.tickets().await?;
        Ok(tickets.iter().filter(|ticket| ticket.as_service().is_some()).count())
    }
}
