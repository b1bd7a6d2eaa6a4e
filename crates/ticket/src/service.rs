//! Target service identifiers.
//!
//! A [`Service`] names the application a service ticket authorizes. Ticket
//! validation compares the service presented at validation time against the
//! one the ticket was granted for; the comparison tolerates query-parameter
//! reordering but nothing else.

use serde::{Deserialize, Serialize};

/// The target service a ticket authorizes, identified by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Service {
    /// Service URL or identifier.
    pub id: String,
}

impl Service {
    /// Creates a service from its URL/identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Whether `other` identifies the same service.
    ///
    /// Exact string equality, or equal base URL (everything before `?`)
    /// with the same multiset of query parameters in any order. Fragments
    /// and percent-encoding are not normalized. Total and side-effect-free.
    #[must_use]
    pub fn matches(&self, other: &Service) -> bool {
        if self.id == other.id {
            return true;
        }

        let (base_a, query_a) = split_query(&self.id);
        let (base_b, query_b) = split_query(&other.id);
        if base_a != base_b {
            return false;
        }

        let mut params_a = query_params(query_a);
        let mut params_b = query_params(query_b);
        params_a.sort_unstable();
        params_b.sort_unstable();
        params_a == params_b
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    }
}

fn query_params(query: Option<&str>) -> Vec<&str> {
    match query {
        Some(q) if !q.is_empty() => q.split('&').collect(),
        _ => Vec::new(),
    }
}
