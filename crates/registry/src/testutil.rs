//! Shared test utilities for registry testing.
//!
//! Factories for building ticket trees and a failure-injecting store for
//! exercising store-unavailable paths. Feature-gated behind `testutil` to
//! keep it out of production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! gatekey-registry = { path = "../registry", features = ["testutil"] }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use gatekey_ticket::{
    Authentication, ExpirationPolicy, Principal, Service, ServiceTicket, TicketGrantingTicket,
    TicketId, TicketIdGenerator, TicketKind,
};

use crate::error::{RegistryError, RegistryResult};
use crate::store::{SharedMemoryTicketStore, TicketStore};

/// Creates an authentication for the given principal id, stamped now.
#[must_use]
pub fn make_authentication(principal: &str) -> Authentication {
    Authentication::new(Principal::new(principal), Utc::now())
}

/// Creates a root TGT for principal `"alice"` under the given policy.
#[must_use]
pub fn make_tgt(generator: &TicketIdGenerator, policy: ExpirationPolicy) -> TicketGrantingTicket {
    TicketGrantingTicket::new(
        generator.new_id(TicketKind::TicketGranting),
        make_authentication("alice"),
        policy,
        Utc::now(),
    )
}

/// Grants a service ticket for `service_url` from `tgt` under the given
/// policy.
///
/// # Panics
///
/// Panics if the grant fails; use only with live TGTs.
pub fn make_st(
    generator: &TicketIdGenerator,
    tgt: &mut TicketGrantingTicket,
    service_url: &str,
    policy: ExpirationPolicy,
) -> ServiceTicket {
    tgt.grant_service_ticket(
        generator.new_id(TicketKind::Service),
        Service::new(service_url),
        policy,
        false,
        Utc::now(),
    )
    .expect("granting from a live test TGT should succeed")
}

/// A [`TicketStore`] whose availability can be switched off to exercise
/// `StoreUnavailable` handling.
///
/// While offline, every operation fails the way an unreachable replicated
/// cache would. Data written while online is kept, so a store can go down
/// and come back mid-test.
#[derive(Clone, Default)]
pub struct UnreliableTicketStore {
    inner: SharedMemoryTicketStore,
    offline: Arc<AtomicBool>,
}

impl UnreliableTicketStore {
    /// Creates an online store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store's availability.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_available(&self) -> RegistryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::store_unavailable("ticket store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl TicketStore for UnreliableTicketStore {
    async fn put(&self, id: &TicketId, bytes: Vec<u8>) -> RegistryResult<()> {
        self.check_available()?;
        self.inner.put(id, bytes).await
    }

    async fn fetch(&self, id: &TicketId) -> RegistryResult<Option<Bytes>> {
        self.check_available()?;
        self.inner.fetch(id).await
    }

    async fn remove(&self, id: &TicketId) -> RegistryResult<bool> {
        self.check_available()?;
        self.inner.remove(id).await
    }

    async fn scan(&self) -> RegistryResult<Vec<Bytes>> {
        self.check_available()?;
        self.inner.scan().await
    }
}

/// Assert that a [`RegistryResult`] is a
/// [`RegistryError::StoreUnavailable`](crate::error::RegistryError::StoreUnavailable).
#[macro_export]
macro_rules! assert_store_unavailable {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::RegistryError::StoreUnavailable { .. })),
            "expected RegistryError::StoreUnavailable, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`RegistryResult`] is a
/// [`RegistryError::NotFound`](crate::error::RegistryError::NotFound).
#[macro_export]
macro_rules! assert_ticket_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::RegistryError::NotFound { .. })),
            "expected RegistryError::NotFound, got: {:?}",
            $result,
        );
    };
}
