//! # Routing Rules and Endpoints
//!
//! Configuration-side routing types. Rules are immutable records loaded at
//! startup (and hot-reloaded) and passed into the dispatcher's constructor;
//! there is no ambient global routing table. Runtime health bookkeeping
//! (rolling success windows, probe scheduling) lives in the dispatcher
//! subsystem; this module only defines the shared vocabulary.

use serde::{Deserialize, Serialize};

/// Identifier of a downstream authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub String);

impl EndpointId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EndpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Health of an endpoint as maintained by the health checker.
///
/// ```text
/// [Healthy] ──soft failures──→ [Degraded] ──consecutive failures──→ [Down]
///     ▲                                                               │
///     └────────────────────── successful probe ──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthState {
    /// Endpoint is answering normally.
    Healthy,
    /// Recent soft failures observed; still routable.
    Degraded,
    /// Endpoint is excluded from candidate selection until a probe succeeds.
    Down,
}

impl HealthState {
    /// Whether the dispatcher may send traffic to an endpoint in this state.
    #[must_use]
    pub fn is_routable(self) -> bool {
        !matches!(self, Self::Down)
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Degraded => f.write_str("degraded"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// Static descriptor of a downstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Stable identifier referenced by routing rules.
    pub id: EndpointId,
    /// Transport descriptor (host:port or logical name for in-process
    /// connectors). Opaque to the dispatcher core.
    pub transport: String,
}

/// Predicate over a classified message. All populated bounds must match;
/// empty bounds match everything, so the empty predicate is the catch-all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePredicate {
    /// Inclusive account-reference prefix range (BIN range), as digit strings.
    pub account_range: Option<(String, String)>,
    /// Inclusive lower bound on the amount in minor units.
    pub min_amount: Option<u64>,
    /// Inclusive upper bound on the amount in minor units.
    pub max_amount: Option<u64>,
    /// Admitted ISO numeric currency codes. Empty means any.
    #[serde(default)]
    pub currencies: Vec<u16>,
    /// Admitted merchant category classes. Empty means any.
    #[serde(default)]
    pub merchant_classes: Vec<u16>,
}

impl RoutePredicate {
    /// Evaluates the predicate against message attributes. `account_ref` is
    /// matched by digit-prefix against the configured BIN range.
    #[must_use]
    pub fn matches(
        &self,
        account_ref: Option<&str>,
        amount: Option<u64>,
        currency: Option<u16>,
        merchant_class: Option<u16>,
    ) -> bool {
        if let Some((lo, hi)) = &self.account_range {
            let Some(account) = account_ref else {
                return false;
            };
            let width = lo.len().min(hi.len());
            let Some(prefix) = account.get(..width) else {
                return false;
            };
            if prefix < lo.as_str() || prefix > hi.as_str() {
                return false;
            }
        }
        if let Some(min) = self.min_amount {
            if amount.map_or(true, |a| a < min) {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if amount.map_or(true, |a| a > max) {
                return false;
            }
        }
        if !self.currencies.is_empty() {
            if currency.map_or(true, |c| !self.currencies.contains(&c)) {
                return false;
            }
        }
        if !self.merchant_classes.is_empty() {
            if merchant_class.map_or(true, |m| !self.merchant_classes.contains(&m)) {
                return false;
            }
        }
        true
    }

    /// Whether this predicate matches every message (catch-all).
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.account_range.is_none()
            && self.min_amount.is_none()
            && self.max_amount.is_none()
            && self.currencies.is_empty()
            && self.merchant_classes.is_empty()
    }
}

/// One routing rule: predicate → priority-ordered candidate endpoints.
///
/// Rules are evaluated in ascending `priority` order; the first match wins.
/// The endpoint list is the cascading-fallback order for that rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Rule name for logs and audit events.
    pub name: String,
    /// Evaluation precedence; lower evaluates first.
    pub priority: u16,
    /// Match condition.
    pub predicate: RoutePredicate,
    /// Candidate endpoints in fallback order.
    pub endpoints: Vec<EndpointId>,
}
