//! Ticket entities and the grant/expire state machine.
//!
//! A ticket is created once with an immutable id, creation time, and
//! expiration policy, then mutated in place only via a *use* (granting a
//! descendant ticket) or an *expire* (idempotent, one-way). There is no
//! `Expired → Active` transition; policy-driven expiry is re-evaluated on
//! every read because the answer depends on wall-clock time.
//!
//! Parent links are weak: a [`ServiceTicket`] holds its granting ticket's
//! *id*, never the ticket itself. The granting ticket owns the relationship
//! through its `services_granted` / `proxy_granting_tickets` maps, which is
//! what fan-out logout walks. Both maps are `BTreeMap`s so a serialized
//! ticket graph has a deterministic byte layout.
//!
//! A proxy-granting ticket is a [`TicketGrantingTicket`] whose id carries
//! the `PGT-` prefix and whose [`proxied_by`](TicketGrantingTicket::proxied_by)
//! names the service ticket it was minted from. It grants further tickets
//! exactly like a root TGT.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::authentication::Authentication;
use crate::error::TicketError;
use crate::expiration::{ExpirationPolicy, TicketState};
use crate::id::{TicketId, TicketKind};
use crate::service::Service;

/// State shared by every ticket kind: identity, timestamps, use counter,
/// policy, and the explicit expired flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCore {
    id: TicketId,
    creation_time: DateTime<Utc>,
    last_time_used: DateTime<Utc>,
    previous_time_used: Option<DateTime<Utc>>,
    count_of_uses: u32,
    expiration_policy: ExpirationPolicy,
    expired: bool,
}

impl TicketCore {
    fn new(id: TicketId, expiration_policy: ExpirationPolicy, now: DateTime<Utc>) -> Self {
        Self {
            id,
            creation_time: now,
            last_time_used: now,
            previous_time_used: None,
            count_of_uses: 0,
            expiration_policy,
            expired: false,
        }
    }

    /// The ticket's id.
    #[must_use]
    pub fn id(&self) -> &TicketId {
        &self.id
    }

    /// When the ticket was created.
    #[must_use]
    pub fn creation_time(&self) -> DateTime<Utc> {
        self.creation_time
    }

    /// When the ticket last granted a descendant; creation time until the
    /// first use.
    #[must_use]
    pub fn last_time_used(&self) -> DateTime<Utc> {
        self.last_time_used
    }

    /// The use before the last one, if the ticket has been used twice.
    #[must_use]
    pub fn previous_time_used(&self) -> Option<DateTime<Utc>> {
        self.previous_time_used
    }

    /// How many descendants this ticket has granted.
    #[must_use]
    pub fn count_of_uses(&self) -> u32 {
        self.count_of_uses
    }

    /// The expiration policy the ticket was created with.
    #[must_use]
    pub fn expiration_policy(&self) -> &ExpirationPolicy {
        &self.expiration_policy
    }

    /// Whether the ticket was explicitly expired (logout/revocation),
    /// independent of policy-computed expiry.
    #[must_use]
    pub fn is_explicitly_expired(&self) -> bool {
        self.expired
    }

    fn state<'a>(&'a self, authentication: Option<&'a Authentication>) -> TicketState<'a> {
        TicketState {
            creation_time: self.creation_time,
            last_time_used: self.last_time_used,
            previous_time_used: self.previous_time_used,
            count_of_uses: self.count_of_uses,
            authentication,
        }
    }

    fn is_expired_at(&self, authentication: Option<&Authentication>, now: DateTime<Utc>) -> bool {
        self.expired || self.expiration_policy.is_expired_at(Some(&self.state(authentication)), now)
    }

    fn expire(&mut self) {
        self.expired = true;
    }

    fn record_use(&mut self, now: DateTime<Utc>) {
        self.previous_time_used = Some(self.last_time_used);
        self.last_time_used = now;
        self.count_of_uses += 1;
    }

    /// Checks that this ticket may grant a descendant at `now`.
    ///
    /// Use-limit exhaustion is reported as `IllegalState` so callers can
    /// tell an over-used source from a timed-out one; every other failure
    /// is `Expired`.
    fn grant_guard(
        &self,
        authentication: Option<&Authentication>,
        now: DateTime<Utc>,
    ) -> Result<(), TicketError> {
        if self.expired {
            return Err(TicketError::expired(self.id.clone()));
        }
        if let Some(limit) = self.expiration_policy.use_limit() {
            if self.count_of_uses >= limit {
                return Err(TicketError::illegal_state(
                    self.id.clone(),
                    format!("use limit of {limit} reached"),
                ));
            }
        }
        if self.expiration_policy.is_expired_at(Some(&self.state(authentication)), now) {
            return Err(TicketError::expired(self.id.clone()));
        }
        Ok(())
    }
}

/// Root credential of an SSO session, or — when
/// [`proxied_by`](Self::proxied_by) is set — a proxy-granting ticket chained
/// below a service ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketGrantingTicket {
    core: TicketCore,
    authentication: Authentication,
    chained_authentications: Vec<Authentication>,
    services_granted: BTreeMap<TicketId, Service>,
    proxy_granting_tickets: BTreeMap<TicketId, Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxied_by: Option<TicketId>,
}

impl TicketGrantingTicket {
    /// Creates a root ticket-granting ticket for the given authentication.
    #[must_use]
    pub fn new(
        id: TicketId,
        authentication: Authentication,
        expiration_policy: ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let chained_authentications = vec![authentication.clone()];
        Self {
            core: TicketCore::new(id, expiration_policy, now),
            authentication,
            chained_authentications,
            services_granted: BTreeMap::new(),
            proxy_granting_tickets: BTreeMap::new(),
            proxied_by: None,
        }
    }

    /// The ticket's id.
    #[must_use]
    pub fn id(&self) -> &TicketId {
        self.core.id()
    }

    /// Shared ticket state (timestamps, use counter, policy).
    #[must_use]
    pub fn core(&self) -> &TicketCore {
        &self.core
    }

    /// The authentication this ticket was granted for.
    #[must_use]
    pub fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    /// Authentications from the root of the tree down to this ticket.
    /// For a root TGT this is exactly its own authentication.
    #[must_use]
    pub fn chained_authentications(&self) -> &[Authentication] {
        &self.chained_authentications
    }

    /// Every service ticket issued from this ticket, by id.
    #[must_use]
    pub fn services_granted(&self) -> &BTreeMap<TicketId, Service> {
        &self.services_granted
    }

    /// Every proxy-granting ticket rooted below this ticket, by id.
    #[must_use]
    pub fn proxy_granting_tickets(&self) -> &BTreeMap<TicketId, Service> {
        &self.proxy_granting_tickets
    }

    /// The service ticket this PGT was minted from; `None` for a root TGT.
    #[must_use]
    pub fn proxied_by(&self) -> Option<&TicketId> {
        self.proxied_by.as_ref()
    }

    /// Whether this is the root of its ticket tree.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.proxied_by.is_none()
    }

    /// Whether the ticket is expired at instant `now`: the explicit flag,
    /// or the policy's verdict. Re-evaluated on every call.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.core.is_expired_at(Some(&self.authentication), now)
    }

    /// [`is_expired_at`](Self::is_expired_at) evaluated at `Utc::now()`.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Explicitly expires the ticket (logout/revocation). Idempotent and
    /// irreversible.
    pub fn expire(&mut self) {
        self.core.expire();
    }

    /// Grants a service ticket for `service`.
    ///
    /// Records the use (counter and timestamps) and tracks the new ticket
    /// in [`services_granted`](Self::services_granted). The service ticket
    /// inherits this ticket's full authentication chain;
    /// `credentials_provided` marks a ticket minted in the same transaction
    /// as a fresh credential check (the protocol's `renew` semantics).
    ///
    /// # Errors
    ///
    /// - [`TicketError::Expired`] if this ticket is expired.
    /// - [`TicketError::IllegalState`] if this ticket's use limit is
    ///   exhausted.
    pub fn grant_service_ticket(
        &mut self,
        id: TicketId,
        service: Service,
        expiration_policy: ExpirationPolicy,
        credentials_provided: bool,
        now: DateTime<Utc>,
    ) -> Result<ServiceTicket, TicketError> {
        self.core.grant_guard(Some(&self.authentication), now)?;
        self.core.record_use(now);
        debug!(granting = %self.core.id(), ticket = %id, %service, "granted service ticket");
        self.services_granted.insert(id.clone(), service.clone());

        Ok(ServiceTicket {
            core: TicketCore::new(id, expiration_policy, now),
            service,
            granting_ticket: self.core.id().clone(),
            from_new_login: credentials_provided,
            chained_authentications: self.chained_authentications.clone(),
        })
    }

    /// Tracks a proxy-granting ticket minted from one of this ticket's
    /// service tickets, so fan-out logout can revoke it later.
    ///
    /// Issuance calls this on the granting TGT after
    /// [`ServiceTicket::grant_proxy_granting_ticket`] succeeds — the
    /// service ticket only holds its parent's id and cannot reach it.
    pub fn track_proxy_granting_ticket(&mut self, id: TicketId, service: Service) {
        debug!(granting = %self.core.id(), ticket = %id, "tracking proxy-granting ticket");
        self.proxy_granting_tickets.insert(id, service);
    }

    /// Ids of every descendant recorded on this ticket: granted service
    /// tickets and tracked proxy-granting tickets.
    #[must_use]
    pub fn child_ids(&self) -> Vec<TicketId> {
        self.services_granted
            .keys()
            .chain(self.proxy_granting_tickets.keys())
            .cloned()
            .collect()
    }
}

/// Single-service authorization minted from a ticket-granting ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTicket {
    core: TicketCore,
    service: Service,
    granting_ticket: TicketId,
    from_new_login: bool,
    chained_authentications: Vec<Authentication>,
}

impl ServiceTicket {
    /// The ticket's id.
    #[must_use]
    pub fn id(&self) -> &TicketId {
        self.core.id()
    }

    /// Shared ticket state (timestamps, use counter, policy).
    #[must_use]
    pub fn core(&self) -> &TicketCore {
        &self.core
    }

    /// The service this ticket authorizes.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Id of the granting ticket. A weak back reference: resolving it
    /// requires a registry lookup, and the parent may already be gone.
    #[must_use]
    pub fn granting_ticket(&self) -> &TicketId {
        &self.granting_ticket
    }

    /// Whether this ticket was minted in the same transaction as the
    /// parent's original credential check.
    #[must_use]
    pub fn is_from_new_login(&self) -> bool {
        self.from_new_login
    }

    /// Authentications from the root of the tree down to this ticket,
    /// proving proxy provenance. Never empty.
    #[must_use]
    pub fn chained_authentications(&self) -> &[Authentication] {
        &self.chained_authentications
    }

    /// The authentication nearest this ticket (last link of the chain).
    #[must_use]
    pub fn authentication(&self) -> Option<&Authentication> {
        self.chained_authentications.last()
    }

    /// Whether this ticket authorizes access to `service`.
    /// See [`Service::matches`] for the equivalence applied.
    #[must_use]
    pub fn is_valid_for(&self, service: &Service) -> bool {
        self.service.matches(service)
    }

    /// Whether the ticket is expired at instant `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.core.is_expired_at(self.chained_authentications.last(), now)
    }

    /// [`is_expired_at`](Self::is_expired_at) evaluated at `Utc::now()`.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Explicitly expires the ticket. Idempotent and irreversible.
    pub fn expire(&mut self) {
        self.core.expire();
    }

    /// Grants a proxy-granting ticket from this service ticket.
    ///
    /// Records the use; the resulting PGT carries this ticket's
    /// authentication chain extended by `authentication`, and names this
    /// ticket as [`proxied_by`](TicketGrantingTicket::proxied_by). The
    /// caller must also
    /// [`track_proxy_granting_ticket`](TicketGrantingTicket::track_proxy_granting_ticket)
    /// on the granting TGT so revocation fan-out reaches the new ticket.
    ///
    /// # Errors
    ///
    /// - [`TicketError::IllegalState`] if this ticket's use limit is already
    ///   exhausted.
    /// - [`TicketError::Expired`] if this ticket is expired.
    pub fn grant_proxy_granting_ticket(
        &mut self,
        id: TicketId,
        authentication: Authentication,
        expiration_policy: ExpirationPolicy,
        now: DateTime<Utc>,
    ) -> Result<TicketGrantingTicket, TicketError> {
        self.core.grant_guard(self.chained_authentications.last(), now)?;
        self.core.record_use(now);
        debug!(granting = %self.core.id(), ticket = %id, "granted proxy-granting ticket");

        let mut chained_authentications = self.chained_authentications.clone();
        chained_authentications.push(authentication.clone());

        Ok(TicketGrantingTicket {
            core: TicketCore::new(id, expiration_policy, now),
            authentication,
            chained_authentications,
            services_granted: BTreeMap::new(),
            proxy_granting_tickets: BTreeMap::new(),
            proxied_by: Some(self.core.id().clone()),
        })
    }
}

/// The registry's unit of storage: any ticket kind, serde-tagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ticket {
    /// A ticket-granting ticket (root TGT or PGT).
    TicketGranting(TicketGrantingTicket),
    /// A service ticket.
    Service(ServiceTicket),
}

impl Ticket {
    /// The ticket's id.
    #[must_use]
    pub fn id(&self) -> &TicketId {
        match self {
            Self::TicketGranting(ticket) => ticket.id(),
            Self::Service(ticket) => ticket.id(),
        }
    }

    /// The kind encoded in the ticket's id prefix.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        self.id().kind()
    }

    /// Whether the ticket is expired at instant `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::TicketGranting(ticket) => ticket.is_expired_at(now),
            Self::Service(ticket) => ticket.is_expired_at(now),
        }
    }

    /// [`is_expired_at`](Self::is_expired_at) evaluated at `Utc::now()`.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Explicitly expires the ticket. Idempotent and irreversible.
    pub fn expire(&mut self) {
        match self {
            Self::TicketGranting(ticket) => ticket.expire(),
            Self::Service(ticket) => ticket.expire(),
        }
    }

    /// Whether this is a root ticket-granting ticket (an SSO session root).
    #[must_use]
    pub fn is_root_granting(&self) -> bool {
        matches!(self, Self::TicketGranting(ticket) if ticket.is_root())
    }

    /// Ids of descendants recorded on this ticket; empty for service
    /// tickets.
    #[must_use]
    pub fn child_ids(&self) -> Vec<TicketId> {
        match self {
            Self::TicketGranting(ticket) => ticket.child_ids(),
            Self::Service(_) => Vec::new(),
        }
    }

    /// Borrows the ticket-granting variant, if that is what this is.
    #[must_use]
    pub fn as_ticket_granting(&self) -> Option<&TicketGrantingTicket> {
        match self {
            Self::TicketGranting(ticket) => Some(ticket),
            Self::Service(_) => None,
        }
    }

    /// Borrows the service variant, if that is what this is.
    #[must_use]
    pub fn as_service(&self) -> Option<&ServiceTicket> {
        match self {
            Self::TicketGranting(_) => None,
            Self::Service(ticket) => Some(ticket),
        }
    }
}

impl From<TicketGrantingTicket> for Ticket {
    fn from(ticket: TicketGrantingTicket) -> Self {
        Self::TicketGranting(ticket)
    }
}

impl From<ServiceTicket> for Ticket {
    fn from(ticket: ServiceTicket) -> Self {
        Self::Service(ticket)
    }
}
