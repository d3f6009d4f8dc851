//! In-process ledger adapter.
//!
//! Balance mutation and audit recording happen under one lock, so an
//! observer never sees a balance without its audit entry. Fault injection
//! hooks let tests exercise the reject, unknown, and
//! unknown-but-actually-applied paths.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::ledger::{LedgerAck, LedgerFault, LedgerPort};

/// One applied posting, for audit queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub account_ref: String,
    pub delta: i64,
    pub idempotency_key: String,
    pub balance_after: i64,
}

/// Behavior of the next `apply` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFaultMode {
    /// Refuse deterministically without applying.
    RejectNext,
    /// Fail with an unknown outcome without applying.
    UnknownNext,
    /// Apply the delta, then report an unknown outcome anyway. Models a
    /// lost acknowledgement.
    UnknownAfterApplyNext,
}

#[derive(Default)]
struct LedgerInner {
    balances: HashMap<String, i64>,
    applied: HashMap<String, i64>,
    audit: Vec<AuditEntry>,
    fault: Option<LedgerFaultMode>,
}

#[derive(Default)]
pub struct InMemoryLedger {
    inner: Mutex<LedgerInner>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&self, account_ref: impl Into<String>, amount: i64) {
        let mut inner = self.inner.lock();
        *inner.balances.entry(account_ref.into()).or_insert(0) += amount;
    }

    #[must_use]
    pub fn balance(&self, account_ref: &str) -> i64 {
        self.inner
            .lock()
            .balances
            .get(account_ref)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.inner.lock().audit.clone()
    }

    /// Arms the fault hook for exactly one subsequent `apply`.
    pub fn inject_fault(&self, mode: LedgerFaultMode) {
        self.inner.lock().fault = Some(mode);
    }
}

#[async_trait]
impl LedgerPort for InMemoryLedger {
    async fn apply(
        &self,
        account_ref: &str,
        delta: i64,
        idempotency_key: &str,
    ) -> Result<LedgerAck, LedgerFault> {
        let mut inner = self.inner.lock();

        if let Some(applied_delta) = inner.applied.get(idempotency_key) {
            debug_assert_eq!(*applied_delta, delta);
            return Ok(LedgerAck::AlreadyApplied);
        }

        let fault = inner.fault.take();
        match fault {
            Some(LedgerFaultMode::RejectNext) => {
                return Err(LedgerFault::Rejected("posting refused".into()));
            }
            Some(LedgerFaultMode::UnknownNext) => {
                return Err(LedgerFault::Unknown("ledger timed out".into()));
            }
            Some(LedgerFaultMode::UnknownAfterApplyNext) => {
                Self::post(&mut inner, account_ref, delta, idempotency_key);
                return Err(LedgerFault::Unknown("acknowledgement lost".into()));
            }
            None => {}
        }

        Self::post(&mut inner, account_ref, delta, idempotency_key);
        Ok(LedgerAck::Applied)
    }
}

impl InMemoryLedger {
    fn post(inner: &mut LedgerInner, account_ref: &str, delta: i64, idempotency_key: &str) {
        let balance = inner.balances.entry(account_ref.to_string()).or_insert(0);
        *balance += delta;
        let balance_after = *balance;
        inner.applied.insert(idempotency_key.to_string(), delta);
        inner.audit.push(AuditEntry {
            account_ref: account_ref.to_string(),
            delta,
            idempotency_key: idempotency_key.to_string(),
            balance_after,
        });
    }
}
