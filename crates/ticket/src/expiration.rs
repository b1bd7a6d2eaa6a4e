//! Expiration policy variants.
//!
//! An [`ExpirationPolicy`] is a pure predicate over ticket state and
//! wall-clock time. Policies are plain data — a serde-tagged enum whose
//! parameters round-trip exactly through the replication codec — and carry
//! no behavior beyond [`is_expired_at`](ExpirationPolicy::is_expired_at) and
//! [`time_to_live_at`](ExpirationPolicy::time_to_live_at).
//!
//! # Design
//!
//! - **Fail-closed**: an absent ticket state is expired, for every variant
//!   including [`Never`](ExpirationPolicy::Never).
//! - **Explicit time**: all parameters are [`std::time::Duration`] values.
//!   There is deliberately no numeric constructor whose unit a call site
//!   could get wrong.
//! - **Explicit `now`**: evaluation takes the current instant as an
//!   argument, so boundary behavior is testable without sleeping; the
//!   `is_expired`/`time_to_live` wrappers evaluate at `Utc::now()`.
//! - **Composite as data**: the composite variant holds an ordered list of
//!   named evaluators with explicit match criteria, not a hierarchy of
//!   wrapped implementations.
//!
//! # Variants
//!
//! | Variant | Expired when |
//! |---------|--------------|
//! | `Never` | never (state present) |
//! | `Timeout` | `ttl` elapsed since creation |
//! | `MultiUseOrTimeout` | `max_uses` reached OR `ttl` elapsed since creation |
//! | `Throttled` | `ttl` elapsed since creation, OR a non-first use arrives within `min_gap` of the previous one |
//! | `HardTimeoutSliding` | `hard` elapsed since creation OR `sliding` elapsed since last use |
//! | `Composite` | per the first evaluator whose criteria match; no match ⇒ expired |
//! | `RememberMeDelegating` | per one of two wrapped policies, chosen by an authentication attribute |

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authentication::Authentication;

/// The slice of ticket state an expiration policy may consult.
///
/// Borrowed from the ticket at evaluation time; policies never retain it.
#[derive(Debug, Clone, Copy)]
pub struct TicketState<'a> {
    /// When the ticket was created. Immutable.
    pub creation_time: DateTime<Utc>,
    /// When the ticket was last used to grant a descendant. Equals
    /// `creation_time` until the first use.
    pub last_time_used: DateTime<Utc>,
    /// The use before the last one, if any.
    pub previous_time_used: Option<DateTime<Utc>>,
    /// How many times the ticket has granted a descendant.
    pub count_of_uses: u32,
    /// The authentication carried by the ticket, for attribute-driven
    /// variants.
    pub authentication: Option<&'a Authentication>,
}

/// Wall-clock duration between `since` and `now`, zero if `now` is earlier.
fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(since).to_std().unwrap_or(Duration::ZERO)
}

/// Remaining part of `ttl` measured from `since`, zero once elapsed.
fn remaining(since: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> Duration {
    ttl.saturating_sub(elapsed(since, now))
}

/// Match criteria for one [`Composite`](ExpirationPolicy::Composite)
/// evaluator. Explicit data, evaluated against the ticket's authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "criteria", rename_all = "snake_case")]
pub enum EvaluationCriteria {
    /// Matches every ticket. Useful as a trailing catch-all evaluator.
    Always,
    /// Matches when the authentication carries the named attribute.
    AttributePresent {
        /// Attribute name to look for.
        attribute: String,
    },
    /// Matches when the authentication carries the named attribute with
    /// exactly the given value.
    AttributeEquals {
        /// Attribute name to look for.
        attribute: String,
        /// Required attribute value.
        value: serde_json::Value,
    },
}

impl EvaluationCriteria {
    /// Whether these criteria match the given authentication.
    ///
    /// A ticket without authentication matches only [`Always`](Self::Always).
    #[must_use]
    pub fn matches(&self, authentication: Option<&Authentication>) -> bool {
        match self {
            Self::Always => true,
            Self::AttributePresent { attribute } => {
                authentication.is_some_and(|auth| auth.attribute(attribute).is_some())
            }
            Self::AttributeEquals { attribute, value } => {
                authentication.is_some_and(|auth| auth.attribute(attribute) == Some(value))
            }
        }
    }
}

/// One named entry of a composite policy: criteria plus the policy that is
/// authoritative when the criteria match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEvaluator {
    /// Evaluator name, for diagnostics and configuration.
    pub name: String,
    /// When this evaluator applies.
    pub criteria: EvaluationCriteria,
    /// The policy that decides expiry when the criteria match.
    pub policy: ExpirationPolicy,
}

/// Expiration strategy owned by a ticket.
///
/// See the [module docs](self) for the variant table and the fail-closed
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ExpirationPolicy {
    /// The ticket never expires on its own; only an explicit `expire()`
    /// ends it.
    Never,

    /// Fixed lifetime from creation.
    Timeout {
        /// Lifetime measured from `creation_time`.
        ttl: Duration,
    },

    /// Bounded number of uses or a fixed lifetime, whichever comes first.
    MultiUseOrTimeout {
        /// Uses after which the ticket is expired.
        max_uses: u32,
        /// Lifetime measured from `creation_time`.
        ttl: Duration,
    },

    /// A minimum gap between consecutive uses, within a hard lifetime.
    /// A non-first use arriving sooner than `min_gap` after the previous
    /// one finds the ticket expired. The first use is exempt from the gap
    /// check.
    Throttled {
        /// Minimum allowed gap between consecutive uses.
        min_gap: Duration,
        /// Hard lifetime measured from `creation_time`.
        ttl: Duration,
    },

    /// An absolute lifetime AND an idle sliding window; both must hold.
    HardTimeoutSliding {
        /// Absolute lifetime measured from `creation_time`.
        hard: Duration,
        /// Idle window measured from `last_time_used`, extended by each use.
        sliding: Duration,
    },

    /// Ordered list of named evaluators; the first whose criteria match the
    /// ticket's authentication is authoritative. **No match means
    /// expired** — the composite fails closed where a single policy would
    /// simply apply.
    Composite {
        /// Evaluators consulted in order.
        evaluators: Vec<PolicyEvaluator>,
    },

    /// Delegates to one of two wrapped policies based on an authentication
    /// attribute: `remember_me` when the attribute is truthy, `default`
    /// otherwise.
    RememberMeDelegating {
        /// Attribute marking a remember-me authentication.
        attribute: String,
        /// Policy applied to remember-me sessions.
        remember_me: Box<ExpirationPolicy>,
        /// Policy applied to everything else.
        default: Box<ExpirationPolicy>,
    },
}

impl ExpirationPolicy {
    /// Whether a ticket in `state` is expired at instant `now`.
    ///
    /// Pure: depends only on the arguments. An absent `state` is expired
    /// for every variant (fail-closed).
    #[must_use]
    pub fn is_expired_at(&self, state: Option<&TicketState<'_>>, now: DateTime<Utc>) -> bool {
        let Some(state) = state else {
            return true;
        };

        match self {
            Self::Never => false,
            Self::Timeout { ttl } => elapsed(state.creation_time, now) >= *ttl,
            Self::MultiUseOrTimeout { max_uses, ttl } => {
                state.count_of_uses >= *max_uses || elapsed(state.creation_time, now) >= *ttl
            }
            Self::Throttled { min_gap, ttl } => {
                if elapsed(state.creation_time, now) >= *ttl {
                    return true;
                }
                state.count_of_uses > 0 && elapsed(state.last_time_used, now) < *min_gap
            }
            Self::HardTimeoutSliding { hard, sliding } => {
                elapsed(state.creation_time, now) >= *hard
                    || elapsed(state.last_time_used, now) >= *sliding
            }
            Self::Composite { evaluators } => evaluators
                .iter()
                .find(|evaluator| evaluator.criteria.matches(state.authentication))
                .map_or(true, |evaluator| evaluator.policy.is_expired_at(Some(state), now)),
            Self::RememberMeDelegating { attribute, remember_me, default } => {
                let is_remember_me = state
                    .authentication
                    .is_some_and(|auth| auth.attribute_is_truthy(attribute));
                if is_remember_me {
                    remember_me.is_expired_at(Some(state), now)
                } else {
                    default.is_expired_at(Some(state), now)
                }
            }
        }
    }

    /// Remaining lifetime of a ticket in `state` at instant `now`.
    ///
    /// `None` means unbounded. An absent `state` or an already-expired
    /// ticket yields `Some(Duration::ZERO)`.
    #[must_use]
    pub fn time_to_live_at(
        &self,
        state: Option<&TicketState<'_>>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let Some(state) = state else {
            return Some(Duration::ZERO);
        };

        match self {
            Self::Never => None,
            Self::Timeout { ttl } => Some(remaining(state.creation_time, *ttl, now)),
            Self::MultiUseOrTimeout { max_uses, ttl } => {
                if state.count_of_uses >= *max_uses {
                    Some(Duration::ZERO)
                } else {
                    Some(remaining(state.creation_time, *ttl, now))
                }
            }
            Self::Throttled { ttl, .. } => Some(remaining(state.creation_time, *ttl, now)),
            Self::HardTimeoutSliding { hard, sliding } => {
                let hard_left = remaining(state.creation_time, *hard, now);
                let sliding_left = remaining(state.last_time_used, *sliding, now);
                Some(hard_left.min(sliding_left))
            }
            Self::Composite { evaluators } => evaluators
                .iter()
                .find(|evaluator| evaluator.criteria.matches(state.authentication))
                .map_or(Some(Duration::ZERO), |evaluator| {
                    evaluator.policy.time_to_live_at(Some(state), now)
                }),
            Self::RememberMeDelegating { attribute, remember_me, default } => {
                let is_remember_me = state
                    .authentication
                    .is_some_and(|auth| auth.attribute_is_truthy(attribute));
                if is_remember_me {
                    remember_me.time_to_live_at(Some(state), now)
                } else {
                    default.time_to_live_at(Some(state), now)
                }
            }
        }
    }

    /// [`is_expired_at`](Self::is_expired_at) evaluated at `Utc::now()`.
    #[must_use]
    pub fn is_expired(&self, state: Option<&TicketState<'_>>) -> bool {
        self.is_expired_at(state, Utc::now())
    }

    /// [`time_to_live_at`](Self::time_to_live_at) evaluated at `Utc::now()`.
    #[must_use]
    pub fn time_to_live(&self, state: Option<&TicketState<'_>>) -> Option<Duration> {
        self.time_to_live_at(state, Utc::now())
    }

    /// The direct use limit this policy imposes, if it is use-counted.
    ///
    /// Lets grant operations distinguish "use limit exhausted" from
    /// time-based expiry when reporting failures. Delegating variants do
    /// not resolve their wrapped policies here; their exhaustion surfaces
    /// as ordinary expiry.
    #[must_use]
    pub fn use_limit(&self) -> Option<u32> {
        match self {
            Self::MultiUseOrTimeout { max_uses, .. } => Some(*max_uses),
            _ => None,
        }
    }
}
