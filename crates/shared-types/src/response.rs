//! # Response Codes and Outcomes
//!
//! Typed outcomes that cross component boundaries. Components never leak raw
//! faults upstream; every internal error is converted to one of these before
//! leaving the component that produced it.

use serde::{Deserialize, Serialize};

/// Reason attached to a decline decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclineReason {
    /// Account reference failed format or status checks.
    InvalidAccount,
    /// Account exists but is not in a usable status.
    AccountBlocked,
    /// Amount exceeds a configured limit.
    LimitExceeded,
    /// Too many transactions inside the velocity window.
    VelocityExceeded,
    /// Risk score above the configured threshold.
    SuspectedFraud,
    /// Currency not supported for this account or endpoint.
    UnsupportedCurrency,
}

impl DeclineReason {
    /// Human-readable label used in `declined:<reason>` exit codes.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::InvalidAccount => "invalid-account",
            Self::AccountBlocked => "account-blocked",
            Self::LimitExceeded => "limit-exceeded",
            Self::VelocityExceeded => "velocity-exceeded",
            Self::SuspectedFraud => "suspected-fraud",
            Self::UnsupportedCurrency => "unsupported-currency",
        }
    }
}

/// Enumerated outcome attached to the final message (slot 39 on the wire).
///
/// Soft variants are retryable via cascading fallback; hard variants are
/// terminal and must never be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    /// Transaction approved.
    Approved,
    /// Transient decline; eligible for retry against an alternate endpoint.
    SoftDecline,
    /// Terminal business-rule decline; never retried.
    HardDecline(DeclineReason),
    /// Message failed structural validation.
    FormatError,
    /// No endpoint could produce a decision.
    IssuerUnavailable,
    /// The transaction deadline elapsed before a decision.
    Timeout,
    /// A reversal referenced an original transaction the switch never
    /// completed; nothing was compensated.
    UnableToLocate,
}

impl ResponseCode {
    /// Whether the dispatcher may retry this outcome on another endpoint.
    #[must_use]
    pub fn is_soft_failure(self) -> bool {
        matches!(self, Self::SoftDecline | Self::IssuerUnavailable | Self::Timeout)
    }

    /// Whether this outcome terminates routing immediately.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::HardDecline(_) | Self::FormatError | Self::UnableToLocate
        )
    }

    /// Two-character wire code carried in slot 39.
    #[must_use]
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::Approved => "00",
            Self::HardDecline(DeclineReason::InvalidAccount) => "14",
            Self::HardDecline(DeclineReason::AccountBlocked) => "41",
            Self::HardDecline(DeclineReason::LimitExceeded) => "61",
            Self::HardDecline(DeclineReason::VelocityExceeded) => "65",
            Self::HardDecline(DeclineReason::SuspectedFraud) => "59",
            Self::HardDecline(DeclineReason::UnsupportedCurrency) => "58",
            Self::SoftDecline => "91",
            Self::IssuerUnavailable => "92",
            Self::Timeout => "68",
            Self::FormatError => "30",
            Self::UnableToLocate => "25",
        }
    }

    /// Parses a two-character wire code back into a response code.
    #[must_use]
    pub fn from_wire_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(Self::Approved),
            "14" => Some(Self::HardDecline(DeclineReason::InvalidAccount)),
            "41" => Some(Self::HardDecline(DeclineReason::AccountBlocked)),
            "61" => Some(Self::HardDecline(DeclineReason::LimitExceeded)),
            "65" => Some(Self::HardDecline(DeclineReason::VelocityExceeded)),
            "59" => Some(Self::HardDecline(DeclineReason::SuspectedFraud)),
            "58" => Some(Self::HardDecline(DeclineReason::UnsupportedCurrency)),
            "91" => Some(Self::SoftDecline),
            "92" => Some(Self::IssuerUnavailable),
            "68" => Some(Self::Timeout),
            "30" => Some(Self::FormatError),
            "25" => Some(Self::UnableToLocate),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => f.write_str("approved"),
            Self::SoftDecline => f.write_str("soft-decline"),
            Self::HardDecline(reason) => write!(f, "declined:{}", reason.label()),
            Self::FormatError => f.write_str("failed:format-error"),
            Self::IssuerUnavailable => f.write_str("failed:issuer-unavailable"),
            Self::Timeout => f.write_str("failed:timeout"),
            Self::UnableToLocate => f.write_str("declined:unable-to-locate"),
        }
    }
}

/// Authorization decision produced by the authorizer.
///
/// The authorizer only decides; it never mutates balances. Declines carry
/// the response code so the dispatcher can distinguish hard from soft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// All authorization stages passed.
    Approved,
    /// Some stage declined, with the standardized response code.
    Declined(ResponseCode),
}

impl Decision {
    #[must_use]
    pub fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Response code for the final message.
    #[must_use]
    pub fn response_code(self) -> ResponseCode {
        match self {
            Self::Approved => ResponseCode::Approved,
            Self::Declined(code) => code,
        }
    }
}

/// Terminal outcome of the full pipeline for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalOutcome {
    /// Approved and the ledger operation completed.
    Completed,
    /// Declined by business rules; no ledger movement.
    Declined(ResponseCode),
    /// Approved but the ledger effect could not be confirmed; the original
    /// operation was reversed.
    Reversed(ResponseCode),
    /// Failed before or during execution; no confirmed ledger movement.
    Failed(ResponseCode),
}

impl FinalOutcome {
    /// Response code placed on the outbound message.
    #[must_use]
    pub fn response_code(self) -> ResponseCode {
        match self {
            Self::Completed => ResponseCode::Approved,
            Self::Declined(code) | Self::Reversed(code) | Self::Failed(code) => code,
        }
    }
}

impl std::fmt::Display for FinalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => f.write_str("approved"),
            Self::Declined(code) => write!(f, "{code}"),
            Self::Reversed(code) => write!(f, "reversed:{}", code.wire_code()),
            Self::Failed(code) => write!(f, "{code}"),
        }
    }
}
