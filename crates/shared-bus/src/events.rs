//! # Switch Events
//!
//! Defines all audit/choreography events that flow through the shared bus,
//! one variant per observable lifecycle step.

use serde::{Deserialize, Serialize};
use shared_types::{
    ChannelId, Decision, EndpointId, FinalOutcome, HealthState, MessageCategory, ResponseCode,
    TraceKey,
};

/// Coarse event topics used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Channel ingress.
    Ingress,
    /// Broker admission decisions.
    Admission,
    /// Dispatcher route selection and fallback.
    Routing,
    /// Authorizer decisions.
    Authorization,
    /// Ledger execution and reversal.
    Execution,
    /// Null-router disposals.
    Discard,
    /// Endpoint health transitions.
    Health,
}

/// All events that can be published to the switch bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwitchEvent {
    /// A message arrived on a channel and decoded successfully.
    TransactionReceived {
        trace: TraceKey,
        channel: ChannelId,
        category: MessageCategory,
    },

    /// The broker admitted a message and attached classification metadata.
    TransactionAdmitted {
        trace: TraceKey,
        category: MessageCategory,
        priority: u8,
    },

    /// The dispatcher matched a rule and selected its candidate list.
    RouteSelected {
        trace: TraceKey,
        rule: String,
        candidates: Vec<EndpointId>,
    },

    /// A soft failure triggered a fallback attempt on the next candidate.
    FallbackAttempted {
        trace: TraceKey,
        failed: EndpointId,
        next: EndpointId,
        attempt: u8,
    },

    /// The authorizer produced a decision.
    AuthorizationDecided {
        trace: TraceKey,
        endpoint: EndpointId,
        decision: Decision,
    },

    /// The transaction reached a terminal outcome.
    TransactionCompleted {
        trace: TraceKey,
        outcome: FinalOutcome,
    },

    /// A compensating reversal was applied (or attempted).
    TransactionReversed {
        trace: TraceKey,
        reversal_confirmed: bool,
    },

    /// The null router disposed of a message.
    TransactionDiscarded {
        /// Trace key when one could be extracted from the message.
        trace: Option<TraceKey>,
        reason: String,
        code: ResponseCode,
    },

    /// The health checker moved an endpoint to a new state.
    EndpointHealthChanged {
        endpoint: EndpointId,
        from: HealthState,
        to: HealthState,
    },
}

impl SwitchEvent {
    /// Topic this event belongs to.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TransactionReceived { .. } => EventTopic::Ingress,
            Self::TransactionAdmitted { .. } => EventTopic::Admission,
            Self::RouteSelected { .. } | Self::FallbackAttempted { .. } => EventTopic::Routing,
            Self::AuthorizationDecided { .. } => EventTopic::Authorization,
            Self::TransactionCompleted { .. } | Self::TransactionReversed { .. } => {
                EventTopic::Execution
            }
            Self::TransactionDiscarded { .. } => EventTopic::Discard,
            Self::EndpointHealthChanged { .. } => EventTopic::Health,
        }
    }

    /// Trace key carried by the event, when the event is transaction-scoped.
    #[must_use]
    pub fn trace(&self) -> Option<&TraceKey> {
        match self {
            Self::TransactionReceived { trace, .. }
            | Self::TransactionAdmitted { trace, .. }
            | Self::RouteSelected { trace, .. }
            | Self::FallbackAttempted { trace, .. }
            | Self::AuthorizationDecided { trace, .. }
            | Self::TransactionCompleted { trace, .. }
            | Self::TransactionReversed { trace, .. } => Some(trace),
            Self::TransactionDiscarded { trace, .. } => trace.as_ref(),
            Self::EndpointHealthChanged { .. } => None,
        }
    }
}

/// Subscription filter over event topics.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to receive. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Filter that matches every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter restricted to the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Whether `event` passes this filter.
    #[must_use]
    pub fn matches(&self, event: &SwitchEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}
