//! Ticket identifiers.
//!
//! Every ticket id carries a kind prefix (`TGT-`, `ST-`, `PGT-`,
//! `PGTIOU-`) so the kind of a ticket can be recovered from its id alone —
//! in log lines, in a shared backing store, and in the parent back-references
//! service tickets hold. [`TicketId`] is a newtype over `String`; the
//! newtype prevents passing an arbitrary string where a ticket id is
//! expected, and parsing rejects strings without a known prefix.
//!
//! # Example
//!
//! ```
//! use gatekey_ticket::{TicketId, TicketKind};
//!
//! let id: TicketId = "TGT-17-k3j2v9q1-node1".parse()?;
//! assert_eq!(id.kind(), TicketKind::TicketGranting);
//! # Ok::<(), gatekey_ticket::ParseTicketIdError>(())
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of a ticket, as encoded in its id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    /// Ticket-granting ticket: root credential of an SSO session.
    TicketGranting,
    /// Service ticket: single-use authorization for one target service.
    Service,
    /// Proxy-granting ticket: root of a proxy-authentication chain.
    ProxyGranting,
    /// Proxy-granting ticket IOU, handed to the proxying service while the
    /// PGT itself travels over the callback channel.
    ProxyGrantingIou,
}

impl TicketKind {
    /// Id prefix for this kind, including the trailing separator.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::TicketGranting => "TGT-",
            Self::Service => "ST-",
            Self::ProxyGranting => "PGT-",
            Self::ProxyGrantingIou => "PGTIOU-",
        }
    }

    /// Recovers the kind from an id string, if it carries a known prefix.
    ///
    /// `PGTIOU-` is checked before `PGT-` since the latter is a prefix of
    /// the former.
    #[must_use]
    pub fn of(id: &str) -> Option<Self> {
        if id.starts_with("PGTIOU-") {
            Some(Self::ProxyGrantingIou)
        } else if id.starts_with("PGT-") {
            Some(Self::ProxyGranting)
        } else if id.starts_with("TGT-") {
            Some(Self::TicketGranting)
        } else if id.starts_with("ST-") {
            Some(Self::Service)
        } else {
            None
        }
    }
}

/// Error returned when parsing a string without a known ticket prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTicketIdError {
    /// The rejected input.
    pub input: String,
}

impl Display for ParseTicketIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Not a ticket id (unknown prefix): {}", self.input)
    }
}

impl std::error::Error for ParseTicketIdError {}

/// Globally unique, kind-prefixed ticket identifier.
///
/// Serializes as a plain string. Usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Wraps an already-validated id string.
    ///
    /// Intended for the id generator; external input should go through
    /// [`FromStr`] so unknown prefixes are rejected.
    #[must_use]
    pub(crate) fn from_generated(id: String) -> Self {
        Self(id)
    }

    /// The kind encoded in this id's prefix.
    ///
    /// # Panics
    ///
    /// Never panics: construction guarantees a known prefix.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        // Construction only admits known prefixes.
        TicketKind::of(&self.0).unwrap_or(TicketKind::TicketGranting)
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TicketId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TicketId {
    type Err = ParseTicketIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match TicketKind::of(s) {
            Some(_) => Ok(Self(s.to_owned())),
            None => Err(ParseTicketIdError { input: s.to_owned() }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_prefixes() {
        assert_eq!(TicketKind::TicketGranting.prefix(), "TGT-");
        assert_eq!(TicketKind::Service.prefix(), "ST-");
        assert_eq!(TicketKind::ProxyGranting.prefix(), "PGT-");
        assert_eq!(TicketKind::ProxyGrantingIou.prefix(), "PGTIOU-");
    }

    #[test]
    fn test_parse_recovers_kind() {
        let id: TicketId = "ST-3-abcdef-node2".parse().unwrap();
        assert_eq!(id.kind(), TicketKind::Service);
    }

    #[test]
    fn test_pgtiou_not_confused_with_pgt() {
        let iou: TicketId = "PGTIOU-1-xyz-n".parse().unwrap();
        assert_eq!(iou.kind(), TicketKind::ProxyGrantingIou);

        let pgt: TicketId = "PGT-1-xyz-n".parse().unwrap();
        assert_eq!(pgt.kind(), TicketKind::ProxyGranting);
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        let result: std::result::Result<TicketId, _> = "SESSION-123".parse();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("SESSION-123"));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("".parse::<TicketId>().is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id: TicketId = "TGT-1-abc-n".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"TGT-1-abc-n\"");
    }

    #[test]
    fn test_serde_roundtrip() {
        let id: TicketId = "PGT-9-qrs-n".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        let back: TicketId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_usable_as_map_key() {
        use std::collections::BTreeMap;

        let mut map: BTreeMap<TicketId, &str> = BTreeMap::new();
        let a: TicketId = "ST-1-a-n".parse().unwrap();
        let b: TicketId = "ST-2-b-n".parse().unwrap();
        map.insert(a.clone(), "first");
        map.insert(b, "second");
        assert_eq!(map.get(&a), Some(&"first"));
    }
}
