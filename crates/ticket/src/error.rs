//! Ticket error types.
//!
//! Errors produced by the ticket state machine itself. Registry-level
//! conditions (not found, backing store failures) live in
//! `gatekey-registry`, which wraps these variants to preserve the source
//! chain.

use thiserror::Error;

use crate::id::TicketId;

/// Errors produced by ticket lifecycle operations.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TicketError {
    /// Operation attempted on an expired ticket.
    ///
    /// Distinct from "not found" so callers can report "your session
    /// expired" rather than "invalid ticket".
    #[error("Ticket expired: {id}")]
    Expired {
        /// Id of the expired ticket.
        id: TicketId,
    },

    /// Operation attempted in a state the ticket cannot legally serve,
    /// e.g. granting from a source ticket whose use limit is exhausted.
    /// The caller must restart authentication.
    #[error("Illegal ticket state for {id}: {reason}")]
    IllegalState {
        /// Id of the offending ticket.
        id: TicketId,
        /// Human-readable description of the violated constraint.
        reason: String,
    },
}

impl TicketError {
    /// Creates an `Expired` error for the given ticket id.
    #[must_use]
    pub fn expired(id: TicketId) -> Self {
        Self::Expired { id }
    }

    /// Creates an `IllegalState` error for the given ticket id.
    #[must_use]
    pub fn illegal_state(id: TicketId, reason: impl Into<String>) -> Self {
        Self::IllegalState { id, reason: reason.into() }
    }
}

/// Result type alias for ticket operations.
pub type Result<T> = std::result::Result<T, TicketError>;
