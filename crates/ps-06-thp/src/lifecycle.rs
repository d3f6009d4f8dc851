//! Typestate execution lifecycle.
//!
//! Each stage is a distinct type and every transition consumes `self`, so
//! the compiler rejects double execution or completing a transaction that
//! never began. Terminal stages carry the outcome and nothing else.

use shared_types::{FinalOutcome, ResponseCode, TraceKey, TransactionMessage};

/// An approved transaction waiting to execute.
#[derive(Debug)]
pub struct AuthorizedTx {
    trace: TraceKey,
    message: TransactionMessage,
    account_ref: String,
    /// Signed balance delta in minor units (debits are negative).
    delta: i64,
}

impl AuthorizedTx {
    #[must_use]
    pub fn new(
        trace: TraceKey,
        message: TransactionMessage,
        account_ref: String,
        delta: i64,
    ) -> Self {
        Self {
            trace,
            message,
            account_ref,
            delta,
        }
    }

    #[must_use]
    pub fn trace(&self) -> &TraceKey {
        &self.trace
    }

    /// Enters execution. The authorized stage is gone after this; there is
    /// no way back to it.
    #[must_use]
    pub fn begin(self) -> ExecutingTx {
        ExecutingTx {
            trace: self.trace,
            message: self.message,
            account_ref: self.account_ref,
            delta: self.delta,
        }
    }
}

/// A transaction whose ledger posting is in flight.
#[derive(Debug)]
pub struct ExecutingTx {
    trace: TraceKey,
    message: TransactionMessage,
    account_ref: String,
    delta: i64,
}

impl ExecutingTx {
    #[must_use]
    pub fn trace(&self) -> &TraceKey {
        &self.trace
    }

    #[must_use]
    pub fn account_ref(&self) -> &str {
        &self.account_ref
    }

    #[must_use]
    pub fn delta(&self) -> i64 {
        self.delta
    }

    #[must_use]
    pub fn message(&self) -> &TransactionMessage {
        &self.message
    }

    /// The ledger acknowledged the posting.
    #[must_use]
    pub fn complete(self) -> FinalOutcome {
        FinalOutcome::Completed
    }

    /// The ledger deterministically refused; nothing was applied.
    #[must_use]
    pub fn fail(self, code: ResponseCode) -> FinalOutcome {
        FinalOutcome::Failed(code)
    }

    /// The posting outcome was unknown and a compensating reversal was
    /// issued.
    #[must_use]
    pub fn reverse(self, code: ResponseCode) -> FinalOutcome {
        FinalOutcome::Reversed(code)
    }
}
