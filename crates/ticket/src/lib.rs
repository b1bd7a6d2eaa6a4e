//! # Gatekey Ticket Core
//!
//! Ticket entities and expiration policies for the Gatekey single-sign-on
//! server.
//!
//! A successful login produces a [`TicketGrantingTicket`] (TGT), the root
//! credential of an SSO session. Each access to a downstream service mints a
//! [`ServiceTicket`] (ST) from the TGT; proxy authentication mints a
//! proxy-granting ticket (a [`TicketGrantingTicket`] chained below an ST)
//! which can seed further tickets. Every ticket owns an [`ExpirationPolicy`]
//! that decides, as a pure function of ticket state and wall-clock time,
//! whether the ticket is still live.
//!
//! This crate holds only the entities and their state machine. Storage,
//! cluster replication, and eviction live in `gatekey-registry`.
//!
//! # Modules
//!
//! - [`id`] - Ticket identifiers and kind prefixes
//! - [`idgen`] - Collision-resistant, node-identifiable id generation
//! - [`authentication`] - Principal and authentication results
//! - [`service`] - Target service identifiers and match semantics
//! - [`expiration`] - Expiration policy variants
//! - [`ticket`] - Ticket entities and the grant/expire state machine
//! - [`error`] - Ticket error taxonomy
//!
//! # Example
//!
//! ```
//! use gatekey_ticket::{
//!     Authentication, ExpirationPolicy, Principal, Service, TicketGrantingTicket,
//!     TicketIdGenerator, TicketKind,
//! };
//! use chrono::Utc;
//!
//! let generator = TicketIdGenerator::new();
//! let auth = Authentication::new(Principal::new("alice"), Utc::now());
//!
//! let mut tgt = TicketGrantingTicket::new(
//!     generator.new_id(TicketKind::TicketGranting),
//!     auth,
//!     ExpirationPolicy::Never,
//!     Utc::now(),
//! );
//!
//! let st = tgt.grant_service_ticket(
//!     generator.new_id(TicketKind::Service),
//!     Service::new("https://app.example.org/"),
//!     ExpirationPolicy::MultiUseOrTimeout {
//!         max_uses: 1,
//!         ttl: std::time::Duration::from_secs(10),
//!     },
//!     true,
//!     Utc::now(),
//! )?;
//!
//! assert!(st.is_valid_for(&Service::new("https://app.example.org/")));
//! # Ok::<(), gatekey_ticket::TicketError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod authentication;
pub mod error;
pub mod expiration;
pub mod id;
pub mod idgen;
pub mod service;
pub mod ticket;

// Re-export primary types at crate root for convenience
pub use authentication::{Authentication, Principal};
pub use error::{Result, TicketError};
pub use expiration::{EvaluationCriteria, ExpirationPolicy, PolicyEvaluator, TicketState};
pub use id::{ParseTicketIdError, TicketId, TicketKind};
pub use idgen::TicketIdGenerator;
pub use service::Service;
pub use ticket::{ServiceTicket, Ticket, TicketGrantingTicket};
