//! Principals and authentication results.
//!
//! An [`Authentication`] is the outcome of a successful credential check:
//! the resolved [`Principal`] plus metadata attributes (authentication
//! method, remember-me markers, and so on). The ticket core treats it as an
//! opaque value it owns and chains — credential handling itself happens
//! upstream.
//!
//! Attribute maps are `BTreeMap`s so serialized ticket state has a
//! deterministic byte representation regardless of insertion order.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known id of the anonymous principal sentinel.
pub const ANONYMOUS_PRINCIPAL_ID: &str = "anonymous";

static ANONYMOUS: LazyLock<Principal> = LazyLock::new(|| Principal {
    id: ANONYMOUS_PRINCIPAL_ID.to_owned(),
    attributes: BTreeMap::new(),
});

/// An authenticated subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique principal identifier (username, subject id, ...).
    pub id: String,

    /// Released principal attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Principal {
    /// Creates a principal with no attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), attributes: BTreeMap::new() }
    }

    /// Creates a principal with the given attributes.
    #[must_use]
    pub fn with_attributes(
        id: impl Into<String>,
        attributes: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Self { id: id.into(), attributes }
    }

    /// The process-wide anonymous principal sentinel.
    ///
    /// Constructed once and handed out by reference; compare with
    /// [`Principal::is_anonymous`] rather than by pointer.
    #[must_use]
    pub fn anonymous() -> &'static Principal {
        &ANONYMOUS
    }

    /// Whether this principal is the anonymous sentinel value.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_PRINCIPAL_ID && self.attributes.is_empty()
    }
}

/// A successful authentication result owned by a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    /// The authenticated principal.
    pub principal: Principal,

    /// When the credential check succeeded.
    pub authenticated_at: DateTime<Utc>,

    /// Authentication metadata (method, remember-me, provenance, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Authentication {
    /// Creates an authentication with no metadata attributes.
    #[must_use]
    pub fn new(principal: Principal, authenticated_at: DateTime<Utc>) -> Self {
        Self { principal, authenticated_at, attributes: BTreeMap::new() }
    }

    /// Sets a metadata attribute, returning `self` for chaining.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Looks up a metadata attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    /// Whether the named attribute is present and truthy.
    ///
    /// Truthy: boolean `true`, any non-zero number, or any non-empty
    /// string other than `"false"`. Used by attribute-driven expiration
    /// policies.
    #[must_use]
    pub fn attribute_is_truthy(&self, name: &str) -> bool {
        match self.attributes.get(name) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(serde_json::Value::String(s)) => !s.is_empty() && s != "false",
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_anonymous_sentinel_is_stable() {
        let a = Principal::anonymous();
        let b = Principal::anonymous();
        assert_eq!(a, b);
        assert!(a.is_anonymous());
    }

    #[test]
    fn test_named_principal_is_not_anonymous() {
        assert!(!Principal::new("alice").is_anonymous());
    }

    #[test]
    fn test_attribute_lookup() {
        let auth = Authentication::new(Principal::new("alice"), Utc::now())
            .with_attribute("method", json!("password"));
        assert_eq!(auth.attribute("method"), Some(&json!("password")));
        assert_eq!(auth.attribute("absent"), None);
    }

    #[test]
    fn test_attribute_truthiness() {
        let auth = Authentication::new(Principal::new("alice"), Utc::now())
            .with_attribute("flag_true", json!(true))
            .with_attribute("flag_false", json!(false))
            .with_attribute("count", json!(2))
            .with_attribute("zero", json!(0))
            .with_attribute("name", json!("yes"))
            .with_attribute("empty", json!(""))
            .with_attribute("literal_false", json!("false"));

        assert!(auth.attribute_is_truthy("flag_true"));
        assert!(!auth.attribute_is_truthy("flag_false"));
        assert!(auth.attribute_is_truthy("count"));
        assert!(!auth.attribute_is_truthy("zero"));
        assert!(auth.attribute_is_truthy("name"));
        assert!(!auth.attribute_is_truthy("empty"));
        assert!(!auth.attribute_is_truthy("literal_false"));
        assert!(!auth.attribute_is_truthy("absent"));
    }

    #[test]
    fn test_serde_roundtrip_preserves_timestamp() {
        let auth = Authentication::new(Principal::new("alice"), Utc::now())
            .with_attribute("method", json!("password"));
        let json = serde_json::to_string(&auth).unwrap();
        let back: Authentication = serde_json::from_str(&json).unwrap();
        assert_eq!(auth, back);
        assert_eq!(auth.authenticated_at, back.authenticated_at);
    }

    #[test]
    fn test_empty_attribute_maps_omitted_from_json() {
        let auth = Authentication::new(Principal::new("alice"), Utc::now());
        let json = serde_json::to_string(&auth).unwrap();
        assert!(!json.contains("attributes"));
    }
}
