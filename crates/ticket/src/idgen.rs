//! Ticket id generation.
//!
//! Ids have the shape `PREFIX-<seq>-<random>-<node>`:
//!
//! - `seq` — process-monotonic sequence number, useful when correlating log
//!   lines from one node.
//! - `random` — 20 alphanumeric characters from the thread RNG; this is the
//!   collision-resistant component (~119 bits of entropy).
//! - `node` — optional suffix identifying the minting cluster member, so an
//!   id read out of a shared backing store names the node that created it.
//!   Omitted (along with its separator) when not configured.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::id::{TicketId, TicketKind};

/// Length of the random id component.
const RANDOM_LEN: usize = 20;

/// Generator of collision-resistant, prefixed, node-identifiable ticket ids.
///
/// Cheap to share behind an `Arc`; the sequence counter is atomic and the
/// random component comes from the calling thread's RNG.
///
/// # Example
///
/// ```
/// use gatekey_ticket::{TicketIdGenerator, TicketKind};
///
/// let generator = TicketIdGenerator::with_suffix("node1");
/// let id = generator.new_id(TicketKind::TicketGranting);
/// assert!(id.as_str().starts_with("TGT-"));
/// assert!(id.as_str().ends_with("-node1"));
/// ```
#[derive(Debug, Default)]
pub struct TicketIdGenerator {
    counter: AtomicU64,
    suffix: Option<String>,
}

impl TicketIdGenerator {
    /// Creates a generator with no node suffix.
    #[must_use]
    pub fn new() -> Self {
        Self { counter: AtomicU64::new(0), suffix: None }
    }

    /// Creates a generator whose ids carry the given node suffix.
    #[must_use]
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self { counter: AtomicU64::new(0), suffix: Some(suffix.into()) }
    }

    /// Mints a fresh id of the given kind.
    #[must_use]
    pub fn new_id(&self, kind: TicketKind) -> TicketId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let random: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(RANDOM_LEN).map(char::from).collect();

        let id = match &self.suffix {
            Some(suffix) => format!("{}{seq}-{random}-{suffix}", kind.prefix()),
            None => format!("{}{seq}-{random}", kind.prefix()),
        };
        TicketId::from_generated(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_id_carries_kind_prefix() {
        let generator = TicketIdGenerator::new();
        for kind in [
            TicketKind::TicketGranting,
            TicketKind::Service,
            TicketKind::ProxyGranting,
            TicketKind::ProxyGrantingIou,
        ] {
            let id = generator.new_id(kind);
            assert!(id.as_str().starts_with(kind.prefix()), "id {id} missing prefix");
            assert_eq!(id.kind(), kind);
        }
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let generator = TicketIdGenerator::new();
        let first = generator.new_id(TicketKind::Service);
        let second = generator.new_id(TicketKind::Service);

        let seq = |id: &TicketId| -> u64 {
            id.as_str().split('-').nth(1).unwrap().parse().unwrap()
        };
        assert_eq!(seq(&first) + 1, seq(&second));
    }

    #[test]
    fn test_suffix_appended() {
        let generator = TicketIdGenerator::with_suffix("node7");
        let id = generator.new_id(TicketKind::TicketGranting);
        assert!(id.as_str().ends_with("-node7"));
    }

    #[test]
    fn test_no_suffix_has_three_segments() {
        let generator = TicketIdGenerator::new();
        let id = generator.new_id(TicketKind::Service);
        // "ST" + seq + random
        assert_eq!(id.as_str().split('-').count(), 3);
    }

    #[test]
    fn test_ids_are_unique() {
        let generator = TicketIdGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = generator.new_id(TicketKind::Service);
            assert!(seen.insert(id.as_str().to_owned()), "duplicate id generated");
        }
    }

    #[test]
    fn test_random_component_length() {
        let generator = TicketIdGenerator::with_suffix("n");
        let id = generator.new_id(TicketKind::TicketGranting);
        let random = id.as_str().split('-').nth(2).unwrap();
        assert_eq!(random.len(), RANDOM_LEN);
    }
}
