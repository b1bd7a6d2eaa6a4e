//! Ticket registries for the Gatekey single-sign-on server.
//!
//! This crate provides the [`TicketRegistry`] trait and the registry
//! implementations the issuance and validation services run against.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │               Issuance / Validation services                │
//! │        (credential handling, protocol codecs — external)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     gatekey-registry                        │
//! │                  TicketRegistry trait                       │
//! │   (add_ticket, get_ticket, delete_ticket, tickets)          │
//! ├───────────────────────┬─────────────────────────────────────┤
//! │ InMemoryTicketRegistry│   ReplicatedTicketRegistry<S>       │
//! │     (single node)     │   (serde codec over a TicketStore)  │
//! ├───────────────────────┴─────────────────────────────────────┤
//! │                     RegistryCleaner                         │
//! │        (periodic eviction of expired ticket trees)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Visibility contract
//!
//! `get_ticket` hands the caller a mutable *copy* of the stored ticket.
//! Mutations become visible to other callers (and other cluster nodes) only
//! after an explicit write-back via `add_ticket` — or, on a replicated
//! registry, [`ReplicatedTicketRegistry::update_ticket`]. Exactly one
//! logical owner mutates-then-writes-back per request; concurrent writers
//! to the same id are last-write-wins.
//!
//! # Quick Start
//!
//! ```
//! use gatekey_registry::{InMemoryTicketRegistry, TicketRegistry};
//! use gatekey_ticket::{
//!     Authentication, ExpirationPolicy, Principal, Ticket, TicketGrantingTicket,
//!     TicketIdGenerator, TicketKind,
//! };
//! use chrono::Utc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let registry = InMemoryTicketRegistry::new();
//! let generator = TicketIdGenerator::new();
//!
//! let tgt = TicketGrantingTicket::new(
//!     generator.new_id(TicketKind::TicketGranting),
//!     Authentication::new(Principal::new("alice"), Utc::now()),
//!     ExpirationPolicy::Never,
//!     Utc::now(),
//! );
//! let id = tgt.id().clone();
//!
//! registry.add_ticket(tgt.into()).await.unwrap();
//! assert!(registry.get_ticket(&id).await.unwrap().is_some());
//! # });
//! ```
//!
//! # Modules
//!
//! - [`registry`] - The `TicketRegistry` contract and cascade deletion
//! - [`memory`] - Single-node in-memory registry
//! - [`store`] - Byte-level `TicketStore` contract for shared backing stores
//! - [`codec`] - Serialization of ticket graphs for replication
//! - [`replicated`] - Registry decorator over a shared `TicketStore`
//! - [`cleaner`] - Periodic eviction of expired ticket trees
//! - [`conformance`] - Contract test suite for registry implementations
//! - [`error`] - Registry error taxonomy

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cleaner;
pub mod codec;
#[allow(clippy::expect_used)]
pub mod conformance;
pub mod error;
pub mod memory;
pub mod registry;
pub mod replicated;
pub mod store;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

// Re-export primary types at crate root for convenience
pub use cleaner::{CleanSweep, CleanerConfig, CleanerHandle, RegistryCleaner};
pub use error::{BoxError, ConfigError, RegistryError, RegistryResult};
pub use memory::InMemoryTicketRegistry;
pub use registry::TicketRegistry;
pub use replicated::{ReplicatedTicketRegistry, UpdatePropagation};
pub use store::{SharedMemoryTicketStore, TicketStore};
