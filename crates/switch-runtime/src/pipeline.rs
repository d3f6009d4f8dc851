//! End-to-end transaction pipeline.
//!
//! ```text
//!   channel frame ──▶ broker ──▶ dispatcher ──▶ authorizer decision
//!                       │            │                  │
//!                       │ rejected   │ unroutable       ├─ approved ──▶ processor
//!                       ▼            ▼                  └─ declined ──▶ respond
//!                    null router  null router
//! ```
//!
//! Every inbound message produces exactly one terminal response; every
//! failure branch funnels through the null router, which owes the caller a
//! response code even when it discards the message itself.

use std::sync::Arc;
use std::time::Instant as StdInstant;

use tracing::debug;

use ps_01_codec::response_for;
use ps_03_broker::AdmittedTransaction;
use ps_04_dispatcher::RouteOutcome;
use ps_06_thp::{AuthorizedTx, LedgerPort};
use ps_07_null_router::DiscardReason;
use shared_bus::{EventPublisher, SwitchEvent};
use shared_types::{
    ChannelId, Decision, FinalOutcome, MessageCategory, ResponseCode, TransactionMessage,
    TransactionState,
};
use switch_telemetry::{
    AUTHORIZATION_DURATION, FALLBACKS_TOTAL, TRANSACTIONS_COMPLETED, TRANSACTIONS_DISCARDED,
    TRANSACTIONS_RECEIVED,
};

use crate::container::SwitchContainer;

pub struct SwitchPipeline {
    container: Arc<SwitchContainer>,
}

impl SwitchPipeline {
    #[must_use]
    pub fn new(container: Arc<SwitchContainer>) -> Self {
        Self { container }
    }

    /// Processes one verified inbound message to its terminal response.
    pub async fn process(
        &self,
        message: TransactionMessage,
        channel: &ChannelId,
    ) -> TransactionMessage {
        let c = &*self.container;
        TRANSACTIONS_RECEIVED
            .with_label_values(&[channel.as_str()])
            .inc();

        // Admission.
        let admitted = match c.broker.classify(message.clone(), channel) {
            Ok(admitted) => admitted,
            Err(err) => {
                // A resubmission of a finished transaction is answered with
                // the recorded outcome; only a duplicate with nothing on
                // file goes to the null router.
                if let ps_03_broker::AdmissionError::DuplicateTrace(trace) = &err {
                    if let Some(outcome) = c.processor.recorded_outcome(trace) {
                        debug!(%trace, %outcome, "duplicate submission; replaying recorded outcome");
                        return response_for(&message, outcome.response_code());
                    }
                }
                TRANSACTIONS_DISCARDED
                    .with_label_values(&["inadmissible"])
                    .inc();
                let trace = ps_03_broker::extract_trace(&message, channel);
                let code = c
                    .null_router
                    .discard(trace, DiscardReason::Inadmissible(err.to_string()))
                    .await;
                return response_for(&message, code);
            }
        };

        c.bus
            .publish(SwitchEvent::TransactionReceived {
                trace: admitted.trace.clone(),
                channel: channel.clone(),
                category: admitted.classification.category,
            })
            .await;
        c.bus
            .publish(SwitchEvent::TransactionAdmitted {
                trace: admitted.trace.clone(),
                category: admitted.classification.category,
                priority: admitted.classification.priority,
            })
            .await;

        let outcome = match admitted.classification.category {
            MessageCategory::Network => FinalOutcome::Completed,
            MessageCategory::Reversal => self.process_reversal(&admitted).await,
            MessageCategory::Authorization | MessageCategory::Financial => {
                self.process_forward(&admitted).await
            }
        };

        let state = terminal_state(outcome);
        debug!(trace = %admitted.trace, %state, "transaction reached terminal state");
        TRANSACTIONS_COMPLETED
            .with_label_values(&[&state.to_string()])
            .inc();
        response_for(&admitted.message, outcome.response_code())
    }

    /// Authorization and financial requests: route, decide, execute.
    async fn process_forward(&self, admitted: &AdmittedTransaction) -> FinalOutcome {
        let c = &*self.container;
        let deadline =
            tokio::time::Instant::now() + c.config.dispatcher.transaction_deadline();

        let started = StdInstant::now();
        let routed = c.dispatcher.dispatch(admitted, deadline).await;
        AUTHORIZATION_DURATION.observe(started.elapsed().as_secs_f64());

        match routed {
            RouteOutcome::Unroutable => {
                TRANSACTIONS_DISCARDED
                    .with_label_values(&["unroutable"])
                    .inc();
                let code = c
                    .null_router
                    .discard(Some(admitted.trace.clone()), DiscardReason::Unroutable)
                    .await;
                FinalOutcome::Failed(code)
            }
            RouteOutcome::Exhausted { attempts } => {
                FALLBACKS_TOTAL.inc_by(f64::from(attempts.saturating_sub(1)));
                FinalOutcome::Failed(ResponseCode::IssuerUnavailable)
            }
            RouteOutcome::DeadlineExpired { .. } => {
                FinalOutcome::Failed(ResponseCode::Timeout)
            }
            RouteOutcome::Decided {
                decision, attempts, ..
            } => {
                FALLBACKS_TOTAL.inc_by(f64::from(attempts.saturating_sub(1)));
                match decision {
                    Decision::Declined(code) => FinalOutcome::Declined(code),
                    Decision::Approved => self.execute(admitted).await,
                }
            }
        }
    }

    /// Approved transactions reach the processor; authorization-only
    /// messages decide without moving money.
    async fn execute(&self, admitted: &AdmittedTransaction) -> FinalOutcome {
        if admitted.classification.category == MessageCategory::Authorization {
            debug!(trace = %admitted.trace, "authorization approved; no ledger movement");
            return FinalOutcome::Completed;
        }
        let Some(account_ref) = admitted.message.account_ref() else {
            return FinalOutcome::Failed(ResponseCode::FormatError);
        };
        let amount = admitted.message.amount().unwrap_or(0) as i64;
        let authorized = AuthorizedTx::new(
            admitted.trace.clone(),
            admitted.message.clone(),
            account_ref.to_string(),
            -amount,
        );
        self.container.processor.execute(authorized).await
    }

    /// Inbound reversal requests compensate the original posting. The
    /// reversal key is derived from the original trace, so replayed
    /// reversals and processor-synthesized ones converge on one posting.
    ///
    /// A reversal only moves money when the original transaction has a
    /// recorded outcome that touched the ledger; anything else is answered
    /// without compensation.
    async fn process_reversal(&self, admitted: &AdmittedTransaction) -> FinalOutcome {
        let c = &*self.container;
        let Some(account_ref) = admitted.message.account_ref() else {
            return FinalOutcome::Failed(ResponseCode::FormatError);
        };
        match c.processor.recorded_outcome(&admitted.trace) {
            Some(FinalOutcome::Completed | FinalOutcome::Reversed(_)) => {}
            other => {
                debug!(
                    trace = %admitted.trace,
                    original = ?other,
                    "reversal without a completed original; nothing to compensate"
                );
                return FinalOutcome::Declined(ResponseCode::UnableToLocate);
            }
        }
        let amount = admitted.message.amount().unwrap_or(0) as i64;
        let key = format!("{}#rev", admitted.trace);
        match c.ledger.apply(account_ref, amount, &key).await {
            Ok(_) => {
                c.bus
                    .publish(SwitchEvent::TransactionReversed {
                        trace: admitted.trace.clone(),
                        reversal_confirmed: true,
                    })
                    .await;
                FinalOutcome::Reversed(ResponseCode::Approved)
            }
            Err(fault) => {
                debug!(trace = %admitted.trace, %fault, "reversal posting failed");
                FinalOutcome::Failed(ResponseCode::IssuerUnavailable)
            }
        }
    }
}

/// Coarse lifecycle state a terminal outcome lands the transaction in.
fn terminal_state(outcome: FinalOutcome) -> TransactionState {
    match outcome {
        FinalOutcome::Completed => TransactionState::Completed,
        FinalOutcome::Declined(_) => TransactionState::Declined,
        FinalOutcome::Reversed(_) => TransactionState::Reversed,
        FinalOutcome::Failed(_) => TransactionState::Failed,
    }
}
