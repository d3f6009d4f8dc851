//! # Transaction Handling Processor (PS-06)
//!
//! Executes approved transactions against the ledger and owns the terminal
//! lifecycle: completion, failure, and compensating reversals.
//!
//! ```text
//!   Authorized ──begin()──▶ Executing ──ledger ack──▶ Completed
//!                               │
//!                               ├─ledger reject──▶ Failed
//!                               │
//!                               └─ledger unknown─▶ reversal ──▶ Reversed
//! ```
//!
//! State progression is a typestate: each transition consumes the previous
//! state, so a completed transaction cannot be executed twice by
//! construction. On top of that, an outcome store keyed by trace key makes
//! re-execution of a replayed transaction return the recorded outcome
//! without touching the ledger again.

pub mod ledger;
pub mod lifecycle;
pub mod memory_ledger;
pub mod outcome_store;
pub mod processor;

pub use ledger::{LedgerAck, LedgerFault, LedgerPort};
pub use lifecycle::{AuthorizedTx, ExecutingTx};
pub use memory_ledger::{AuditEntry, InMemoryLedger, LedgerFaultMode};
pub use outcome_store::OutcomeStore;
pub use processor::Processor;
