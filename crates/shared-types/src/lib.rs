//! # Shared Types Crate
//!
//! This crate contains all domain types shared across switch subsystems:
//! the canonical [`TransactionMessage`], trace keys, routing rules, the
//! transaction lifecycle state machine, response codes, and the
//! `AuthenticatedEnvelope` used by channel adapters.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Envelope Integrity**: The `AuthenticatedEnvelope<T>` is the sole
//!   wrapper accepted on a channel before any payload is processed.
//! - **Typed Outcomes**: Components convert internal faults into typed
//!   outcomes (`ResponseCode`, `FinalOutcome`) before crossing a boundary;
//!   raw errors never escalate past the dispatcher.

pub mod envelope;
pub mod errors;
pub mod message;
pub mod response;
pub mod routing;
pub mod security;
pub mod state;
pub mod trace;

pub use envelope::AuthenticatedEnvelope;
pub use errors::MessageError;
pub use message::{slots, FieldValue, MessageCategory, MessageFunction, MessageOrigin, Mti, TransactionMessage};
pub use response::{Decision, DeclineReason, FinalOutcome, ResponseCode};
pub use routing::{Endpoint, EndpointId, HealthState, RoutePredicate, RoutingRule};
pub use security::ChannelKey;
pub use state::TransactionState;
pub use trace::{ChannelId, TraceKey};
