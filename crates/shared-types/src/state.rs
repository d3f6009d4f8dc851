//! # Transaction Lifecycle States
//!
//! The coarse lifecycle every transaction moves through, created on channel
//! ingress and archived after response delivery. Compile-time enforcement of
//! the execution segment (Authorized → Executing → Completed/Failed) lives
//! in the transaction handling processor's type-state module; this enum is
//! the shared runtime view used for audit events and state reporting.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a transaction inside the switch.
///
/// ```text
/// Received ─→ Validated ─→ Routed ─→ Authorizing ─→ Authorized ─→ Executing ─→ Completed
///    │            │           │           │              │             │            │
///    │            │           │           └─→ Declined   │             └─→ Failed ─→ Reversed
///    └────────────┴───────────┴─→ Discarded              └─→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// Message accepted by a channel adapter.
    Received,
    /// Broker admitted the message.
    Validated,
    /// Dispatcher selected a rule and candidate list.
    Routed,
    /// An authorization attempt is in flight.
    Authorizing,
    /// Authorizer approved; awaiting execution.
    Authorized,
    /// Authorizer declined; terminal.
    Declined,
    /// Ledger operation in flight.
    Executing,
    /// Ledger operation confirmed; terminal.
    Completed,
    /// A compensating reversal was applied; terminal.
    Reversed,
    /// Terminal failure (exhaustion, timeout, unconfirmed ledger effect).
    Failed,
    /// Routed to the null router; terminal.
    Discarded,
}

impl TransactionState {
    /// Whether this state ends the lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Declined | Self::Completed | Self::Reversed | Self::Failed | Self::Discarded
        )
    }

    /// Legal direct transitions. Used by the runtime to assert lifecycle
    /// integrity before publishing audit events.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use TransactionState::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Received, Discarded)
                | (Validated, Routed)
                | (Validated, Discarded)
                | (Routed, Authorizing)
                | (Routed, Discarded)
                | (Routed, Failed)
                | (Authorizing, Authorized)
                | (Authorizing, Declined)
                | (Authorizing, Authorizing) // cascading fallback retry
                | (Authorizing, Failed)
                | (Authorized, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Failed, Reversed)
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Routed => "routed",
            Self::Authorizing => "authorizing",
            Self::Authorized => "authorized",
            Self::Declined => "declined",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Reversed => "reversed",
            Self::Failed => "failed",
            Self::Discarded => "discarded",
        };
        f.write_str(label)
    }
}
