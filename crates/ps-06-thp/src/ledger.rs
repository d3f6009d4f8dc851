//! The ledger port.

use async_trait::async_trait;
use thiserror::Error;

/// Positive acknowledgement of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAck {
    /// The delta was applied by this call.
    Applied,
    /// An earlier call with the same idempotency key already applied it.
    AlreadyApplied,
}

/// Negative or indeterminate outcome of a posting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerFault {
    /// The ledger deterministically refused the posting; nothing was
    /// applied, so no compensation is needed.
    #[error("ledger rejected posting: {0}")]
    Rejected(String),

    /// The call failed in a way that leaves the posting state unknown.
    /// The caller must compensate with a reversal.
    #[error("ledger outcome unknown: {0}")]
    Unknown(String),
}

/// Applies signed balance deltas. Implementations must make `apply`
/// idempotent on `idempotency_key`: a repeated key returns
/// [`LedgerAck::AlreadyApplied`] without a second mutation.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    async fn apply(
        &self,
        account_ref: &str,
        delta: i64,
        idempotency_key: &str,
    ) -> Result<LedgerAck, LedgerFault>;
}
