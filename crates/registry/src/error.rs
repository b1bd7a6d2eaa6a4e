//! Registry error types and result alias.
//!
//! All registry implementations map their internal failures to these
//! variants. Ticket state-machine errors from `gatekey-ticket` are wrapped
//! with their source chain preserved so callers can still distinguish
//! expired-ticket failures from illegal-state failures.
//!
//! # Error Types
//!
//! - [`RegistryError::NotFound`] - No ticket under the given id
//! - [`RegistryError::Expired`] - The ticket exists but is expired
//! - [`RegistryError::StoreUnavailable`] - Backing store unreachable; fatal for this request, not retried by the core
//! - [`RegistryError::Serialization`] - Ticket graph could not be encoded/decoded
//! - [`RegistryError::Ticket`] - A wrapped ticket state-machine failure

use std::sync::Arc;

use gatekey_ticket::{TicketError, TicketId};
use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur during registry operations.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// No ticket is stored under the given id.
    ///
    /// Recoverable: the caller reports "no such ticket".
    #[error("Ticket not found: {id}")]
    NotFound {
        /// The id that was not found.
        id: TicketId,
    },

    /// The ticket exists but is expired.
    ///
    /// Surfaced distinctly from [`NotFound`](Self::NotFound) so callers can
    /// report "your session expired" vs "invalid ticket".
    #[error("Ticket expired: {id}")]
    Expired {
        /// The id of the expired ticket.
        id: TicketId,
    },

    /// The backing store cannot be reached.
    ///
    /// Fatal for this request. The core never retries; retry policy belongs
    /// to the backing-store adapter.
    #[error("Backing store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the store failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A ticket graph could not be encoded for — or decoded from — the
    /// backing store. Typically indicates corruption or a schema drift
    /// between cluster nodes.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the codec failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A ticket state-machine failure, wrapped with its source preserved.
    #[error("Ticket operation failed")]
    Ticket(#[source] TicketError),
}

impl RegistryError {
    /// Creates a `NotFound` error for the given id.
    #[must_use]
    pub fn not_found(id: TicketId) -> Self {
        Self::NotFound { id }
    }

    /// Creates an `Expired` error for the given id.
    #[must_use]
    pub fn expired(id: TicketId) -> Self {
        Self::Expired { id }
    }

    /// Creates a `StoreUnavailable` error with the given message.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable { message: message.into(), source: None }
    }

    /// Creates a `StoreUnavailable` error with a message and source error.
    #[must_use]
    pub fn store_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StoreUnavailable { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }
}

impl From<TicketError> for RegistryError {
    fn from(err: TicketError) -> Self {
        Self::Ticket(err)
    }
}

/// Errors produced when validating configuration builders.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A field value is below its allowed minimum.
    #[error("{field} is below the minimum: {value} < {min}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value, rendered for display.
        value: String,
        /// The minimum, rendered for display.
        min: String,
    },
}
