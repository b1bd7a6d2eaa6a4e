//! Serialization codec for replicated ticket graphs.
//!
//! Tickets cross node boundaries as JSON. The entity types keep their
//! serialized layout deterministic (struct fields in declaration order,
//! `BTreeMap` child maps), so the same ticket state always produces the
//! same bytes and every logical field — ids, timestamps, counts, policy
//! parameters — survives a round trip bit-for-bit in value.

use gatekey_ticket::Ticket;

use crate::error::{RegistryError, RegistryResult};

/// Encodes a ticket for the backing store.
///
/// # Errors
///
/// Returns [`RegistryError::Serialization`] when the ticket cannot be
/// encoded.
pub fn encode_ticket(ticket: &Ticket) -> RegistryResult<Vec<u8>> {
    serde_json::to_vec(ticket).map_err(|err| {
        RegistryError::serialization_with_source(
            format!("failed to encode ticket {}", ticket.id()),
            err,
        )
    })
}

/// Decodes a ticket fetched from the backing store.
///
/// # Errors
///
/// Returns [`RegistryError::Serialization`] when the bytes do not decode to
/// a ticket — corruption, or schema drift between cluster nodes.
pub fn decode_ticket(bytes: &[u8]) -> RegistryResult<Ticket> {
    serde_json::from_slice(bytes)
        .map_err(|err| RegistryError::serialization_with_source("failed to decode ticket", err))
}
