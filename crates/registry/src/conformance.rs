//! Conformance test suite for [`TicketRegistry`] implementations.
//!
//! A set of async test functions that check whether a registry
//! implementation satisfies the trait contract. Every registry — in-memory,
//! replicated, or a third-party backing-store adapter — can run the same
//! suite to ensure interoperability.
//!
//! # Usage
//!
//! Call each conformance function with a fresh registry instance:
//!
//! ```no_run
//! use gatekey_registry::{InMemoryTicketRegistry, conformance};
//!
//! #[tokio::test]
//! async fn crud_get_missing_returns_none() {
//!     conformance::crud_get_missing_returns_none(&InMemoryTicketRegistry::new()).await;
//! }
//! ```
//!
//! # Test Categories
//!
//! | Category | Functions | Contract aspect |
//! |----------|-----------|-----------------|
//! | CRUD | 5 tests | add/get/delete_single semantics |
//! | Snapshot | 3 tests | `tickets()` point-in-time and lazy-expiry rules |
//! | Cascade | 3 tests | `delete_ticket` tree fan-out and idempotence |
//! | Counts | 1 test | session / service-ticket counters |

use std::time::Duration;

use chrono::Utc;
use gatekey_ticket::{
    Authentication, ExpirationPolicy, Principal, ServiceTicket, Ticket, TicketGrantingTicket,
    TicketIdGenerator, TicketKind,
};

use crate::registry::TicketRegistry;

fn generator() -> TicketIdGenerator {
    TicketIdGenerator::new()
}

fn session(generator: &TicketIdGenerator, policy: ExpirationPolicy) -> TicketGrantingTicket {
    TicketGrantingTicket::new(
        generator.new_id(TicketKind::TicketGranting),
        Authentication::new(Principal::new("conformance"), Utc::now()),
        policy,
        Utc::now(),
    )
}

fn grant(generator: &TicketIdGenerator, tgt: &mut TicketGrantingTicket) -> ServiceTicket {
    tgt.grant_service_ticket(
        generator.new_id(TicketKind::Service),
        gatekey_ticket::Service::new("https://app.example.org/"),
        ExpirationPolicy::Never,
        false,
        Utc::now(),
    )
    .expect("granting from a live conformance TGT should succeed")
}

// ============================================================================
// CRUD — add/get/delete_single semantics (5 tests)
// ============================================================================

/// `get_ticket` on an absent id returns `Ok(None)`.
pub async fn crud_get_missing_returns_none<R: TicketRegistry>(registry: &R) {
    let absent = generator().new_id(TicketKind::TicketGranting);
    let result = registry.get_ticket(&absent).await;
    assert!(result.is_ok(), "get of an absent id should not error: {result:?}");
    assert!(result.expect("checked above").is_none());
}

/// `add_ticket` then `get_ticket` round-trips the full ticket state.
pub async fn crud_add_then_get_roundtrips<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let tgt = session(&generator, ExpirationPolicy::Timeout { ttl: Duration::from_secs(3600) });
    let id = tgt.id().clone();
    let ticket = Ticket::from(tgt);

    registry.add_ticket(ticket.clone()).await.expect("add should succeed");
    let fetched = registry.get_ticket(&id).await.expect("get should succeed");
    assert_eq!(fetched, Some(ticket), "stored and fetched ticket state must be identical");
}

/// `add_ticket` for an existing id overwrites the stored state.
pub async fn crud_add_overwrites_existing<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let mut tgt = session(&generator, ExpirationPolicy::Never);
    let id = tgt.id().clone();
    registry.add_ticket(tgt.clone().into()).await.expect("add");

    grant(&generator, &mut tgt);
    registry.add_ticket(tgt.clone().into()).await.expect("overwrite");

    let fetched = registry.get_ticket(&id).await.expect("get").expect("present");
    let granting = fetched.as_ticket_granting().expect("granting ticket");
    assert_eq!(granting.core().count_of_uses(), 1, "overwrite must replace stored state");
}

/// `delete_single` on an absent id returns `false` without error.
pub async fn crud_delete_missing_is_false<R: TicketRegistry>(registry: &R) {
    let absent = generator().new_id(TicketKind::Service);
    let removed = registry.delete_single(&absent).await.expect("delete should not error");
    assert!(!removed, "deleting an absent id must report false");
}

/// `delete_single` removes exactly the named entry.
pub async fn crud_delete_removes_ticket<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let tgt = session(&generator, ExpirationPolicy::Never);
    let id = tgt.id().clone();
    registry.add_ticket(tgt.into()).await.expect("add");

    assert!(registry.delete_single(&id).await.expect("delete"));
    assert!(registry.get_ticket(&id).await.expect("get").is_none());
}

// ============================================================================
// Snapshot — tickets() point-in-time and lazy-expiry rules (3 tests)
// ============================================================================

/// `tickets()` contains every added ticket.
pub async fn snapshot_contains_added_tickets<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let a = session(&generator, ExpirationPolicy::Never);
    let b = session(&generator, ExpirationPolicy::Never);
    let ids = [a.id().clone(), b.id().clone()];
    registry.add_ticket(a.into()).await.expect("add a");
    registry.add_ticket(b.into()).await.expect("add b");

    let snapshot = registry.tickets().await.expect("snapshot");
    assert_eq!(snapshot.len(), 2);
    for id in &ids {
        assert!(snapshot.iter().any(|t| t.id() == id), "snapshot missing {id}");
    }
}

/// A snapshot does not reflect writes made after it was taken.
pub async fn snapshot_is_point_in_time<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    registry.add_ticket(session(&generator, ExpirationPolicy::Never).into()).await.expect("add");

    let snapshot = registry.tickets().await.expect("snapshot");
    registry.add_ticket(session(&generator, ExpirationPolicy::Never).into()).await.expect("add");

    assert_eq!(snapshot.len(), 1, "snapshot must be point-in-time");
}

/// Expired tickets are still returned by reads — eviction is the cleaner's
/// job, and callers re-evaluate expiry themselves.
pub async fn snapshot_returns_expired_tickets<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let tgt = session(&generator, ExpirationPolicy::Timeout { ttl: Duration::ZERO });
    let id = tgt.id().clone();
    registry.add_ticket(tgt.into()).await.expect("add");

    let fetched = registry.get_ticket(&id).await.expect("get").expect("still present");
    assert!(fetched.is_expired(), "the ticket should evaluate as expired");
    assert_eq!(registry.tickets().await.expect("snapshot").len(), 1);
}

// ============================================================================
// Cascade — delete_ticket tree fan-out and idempotence (3 tests)
// ============================================================================

/// Deleting a TGT removes its granted service tickets.
pub async fn cascade_delete_removes_descendants<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let mut tgt = session(&generator, ExpirationPolicy::Never);
    let st_a = grant(&generator, &mut tgt);
    let st_b = grant(&generator, &mut tgt);
    let tgt_id = tgt.id().clone();

    registry.add_ticket(tgt.into()).await.expect("add tgt");
    registry.add_ticket(st_a.clone().into()).await.expect("add st a");
    registry.add_ticket(st_b.clone().into()).await.expect("add st b");

    assert!(registry.delete_ticket(&tgt_id).await.expect("cascade delete"));
    assert!(registry.get_ticket(&tgt_id).await.expect("get").is_none());
    assert!(registry.get_ticket(st_a.id()).await.expect("get").is_none());
    assert!(registry.get_ticket(st_b.id()).await.expect("get").is_none());
}

/// The cascade walks nested proxy chains: TGT → ST → PGT → proxied ST.
pub async fn cascade_delete_reaches_proxy_chain<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let mut tgt = session(&generator, ExpirationPolicy::Never);
    let mut st = grant(&generator, &mut tgt);

    let mut pgt = st
        .grant_proxy_granting_ticket(
            generator.new_id(TicketKind::ProxyGranting),
            Authentication::new(Principal::new("proxy.example.org"), Utc::now()),
            ExpirationPolicy::Never,
            Utc::now(),
        )
        .expect("proxy grant");
    tgt.track_proxy_granting_ticket(pgt.id().clone(), st.service().clone());
    let proxied_st = grant(&generator, &mut pgt);

    let tgt_id = tgt.id().clone();
    let all_ids =
        [tgt_id.clone(), st.id().clone(), pgt.id().clone(), proxied_st.id().clone()];

    registry.add_ticket(tgt.into()).await.expect("add tgt");
    registry.add_ticket(st.into()).await.expect("add st");
    registry.add_ticket(pgt.into()).await.expect("add pgt");
    registry.add_ticket(proxied_st.into()).await.expect("add proxied st");

    assert!(registry.delete_ticket(&tgt_id).await.expect("cascade delete"));
    for id in &all_ids {
        assert!(
            registry.get_ticket(id).await.expect("get").is_none(),
            "{id} must be gone after the session root is deleted"
        );
    }
}

/// `delete_ticket` is idempotent: the second call reports `false`.
pub async fn cascade_delete_is_idempotent<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let mut tgt = session(&generator, ExpirationPolicy::Never);
    let st = grant(&generator, &mut tgt);
    let tgt_id = tgt.id().clone();

    registry.add_ticket(tgt.into()).await.expect("add tgt");
    registry.add_ticket(st.into()).await.expect("add st");

    assert!(registry.delete_ticket(&tgt_id).await.expect("first delete"));
    assert!(!registry.delete_ticket(&tgt_id).await.expect("second delete"));
}

// ============================================================================
// Counts (1 test)
// ============================================================================

/// `session_count` reports root TGTs; `service_ticket_count` reports STs;
/// proxy-granting tickets count as neither.
pub async fn counts_sessions_and_service_tickets<R: TicketRegistry>(registry: &R) {
    let generator = generator();
    let mut tgt = session(&generator, ExpirationPolicy::Never);
    let mut st = grant(&generator, &mut tgt);
    let pgt = st
        .grant_proxy_granting_ticket(
            generator.new_id(TicketKind::ProxyGranting),
            Authentication::new(Principal::new("proxy.example.org"), Utc::now()),
            ExpirationPolicy::Never,
            Utc::now(),
        )
        .expect("proxy grant");

    registry.add_ticket(tgt.into()).await.expect("add tgt");
    registry.add_ticket(st.into()).await.expect("add st");
    registry.add_ticket(pgt.into()).await.expect("add pgt");

    assert_eq!(registry.session_count().await.expect("session count"), 1);
    assert_eq!(registry.service_ticket_count().await.expect("st count"), 1);
}
