//! Drives the execution lifecycle against the ledger.

use shared_bus::{EventPublisher, SwitchEvent};
use shared_types::{FinalOutcome, ResponseCode, TraceKey};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ledger::{LedgerFault, LedgerPort};
use crate::lifecycle::AuthorizedTx;
use crate::outcome_store::OutcomeStore;

pub struct Processor {
    ledger: Arc<dyn LedgerPort>,
    outcomes: OutcomeStore,
    bus: Arc<dyn EventPublisher>,
}

impl Processor {
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerPort>, bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            ledger,
            outcomes: OutcomeStore::new(),
            bus,
        }
    }

    /// Recorded terminal outcome for `trace`, if one is still retained.
    ///
    /// The pipeline consults this to answer resubmissions of a finished
    /// transaction and to match inbound reversals against their original.
    #[must_use]
    pub fn recorded_outcome(&self, trace: &TraceKey) -> Option<FinalOutcome> {
        self.outcomes.get(trace)
    }

    /// Executes an approved transaction exactly once.
    ///
    /// A trace key already present in the outcome store short-circuits to
    /// the recorded outcome; the ledger is not touched a second time.
    pub async fn execute(&self, authorized: AuthorizedTx) -> FinalOutcome {
        let trace = authorized.trace().clone();

        if let Some(outcome) = self.outcomes.get(&trace) {
            debug!(%trace, %outcome, "duplicate execution; replaying recorded outcome");
            return outcome;
        }

        let executing = authorized.begin();
        let key = trace.to_string();
        let result = self
            .ledger
            .apply(executing.account_ref(), executing.delta(), &key)
            .await;

        let outcome = match result {
            Ok(_ack) => {
                info!(%trace, "posting acknowledged");
                executing.complete()
            }
            Err(LedgerFault::Rejected(reason)) => {
                warn!(%trace, %reason, "ledger rejected posting");
                executing.fail(ResponseCode::IssuerUnavailable)
            }
            Err(LedgerFault::Unknown(reason)) => {
                warn!(%trace, %reason, "posting outcome unknown; issuing reversal");
                self.compensate(executing).await
            }
        };

        self.outcomes.record(trace.clone(), outcome);
        self.publish_terminal(&trace, outcome).await;
        outcome
    }

    /// Posts the compensating delta under a reversal key derived from the
    /// original trace, so a replayed reversal is idempotent too.
    async fn compensate(&self, executing: crate::lifecycle::ExecutingTx) -> FinalOutcome {
        let trace = executing.trace().clone();
        let reversal_key = format!("{trace}#rev");
        let result = self
            .ledger
            .apply(executing.account_ref(), -executing.delta(), &reversal_key)
            .await;

        let confirmed = match result {
            Ok(_) => true,
            Err(fault) => {
                // The transaction may be half-applied. This is the one
                // state the switch cannot repair on its own.
                error!(
                    %trace,
                    %fault,
                    "UNRESOLVED REVERSAL: manual reconciliation required"
                );
                false
            }
        };

        self.bus
            .publish(SwitchEvent::TransactionReversed {
                trace,
                reversal_confirmed: confirmed,
            })
            .await;
        executing.reverse(ResponseCode::IssuerUnavailable)
    }

    async fn publish_terminal(&self, trace: &TraceKey, outcome: FinalOutcome) {
        self.bus
            .publish(SwitchEvent::TransactionCompleted {
                trace: trace.clone(),
                outcome,
            })
            .await;
    }
}
