//! The staged authorization pipeline.

use shared_types::{Decision, DeclineReason, ResponseCode, TransactionMessage};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::AuthorizerConfig;
use crate::{luhn_valid, AccountDirectory, AccountRecord, RiskScorer, VelocityTracker};

pub struct Authorizer {
    directory: Arc<dyn AccountDirectory>,
    scorer: Arc<dyn RiskScorer>,
    velocity: VelocityTracker,
    config: AuthorizerConfig,
}

impl Authorizer {
    #[must_use]
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        scorer: Arc<dyn RiskScorer>,
        config: AuthorizerConfig,
    ) -> Self {
        Self {
            directory,
            scorer,
            velocity: VelocityTracker::new(config.velocity_window()),
            config,
        }
    }

    /// Runs the staged checks and returns the first decline, or approval.
    ///
    /// Never mutates balances and never returns a hard decline for an
    /// internal fault: a directory failure yields
    /// `Declined(IssuerUnavailable)` so the caller may retry elsewhere.
    pub async fn authorize(&self, message: &TransactionMessage) -> Decision {
        // Stage 1: account format, checksum, existence, status.
        let Some(account_ref) = message.account_ref() else {
            return hard(DeclineReason::InvalidAccount);
        };
        if !luhn_valid(account_ref) {
            debug!(account = mask(account_ref), "account reference failed validation");
            return hard(DeclineReason::InvalidAccount);
        }
        let record = match self.directory.lookup(account_ref).await {
            Ok(Some(record)) => record,
            Ok(None) => return hard(DeclineReason::InvalidAccount),
            Err(err) => {
                warn!(%err, "account directory fault during authorization");
                return Decision::Declined(ResponseCode::IssuerUnavailable);
            }
        };
        if !record.status.is_usable() {
            return hard(DeclineReason::AccountBlocked);
        }

        // Stage 2: limits and velocity.
        if let Some(code) = self.check_limits(message, &record) {
            return Decision::Declined(code);
        }
        let now = message.timestamp().unwrap_or(0);
        let seen = self.velocity.record(account_ref, now);
        if seen > self.config.velocity_max {
            debug!(account = mask(account_ref), seen, "velocity window exceeded");
            return hard(DeclineReason::VelocityExceeded);
        }

        // Stage 3: risk.
        let score = self.scorer.score(message);
        if score >= self.config.risk_threshold {
            debug!(account = mask(account_ref), score, "risk threshold exceeded");
            return hard(DeclineReason::SuspectedFraud);
        }

        Decision::Approved
    }

    fn check_limits(
        &self,
        message: &TransactionMessage,
        record: &AccountRecord,
    ) -> Option<ResponseCode> {
        if !record.currencies.is_empty() {
            match message.currency() {
                Some(c) if record.currencies.contains(&c) => {}
                _ => {
                    return Some(ResponseCode::HardDecline(
                        DeclineReason::UnsupportedCurrency,
                    ))
                }
            }
        }
        if let (Some(limit), Some(amount)) = (record.limit, message.amount()) {
            if amount > limit {
                return Some(ResponseCode::HardDecline(DeclineReason::LimitExceeded));
            }
        }
        None
    }
}

fn hard(reason: DeclineReason) -> Decision {
    Decision::Declined(ResponseCode::HardDecline(reason))
}

/// Keeps the first six and last four digits for logs.
fn mask(account_ref: &str) -> String {
    if account_ref.len() <= 10 {
        return "*".repeat(account_ref.len());
    }
    let (head, rest) = account_ref.split_at(6);
    let tail = &rest[rest.len() - 4..];
    format!("{head}{}{tail}", "*".repeat(rest.len() - 4))
}
