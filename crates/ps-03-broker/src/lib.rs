//! # Broker Subsystem
//!
//! First gate after the channel adapter: validates structural
//! well-formedness, classifies the message, and applies coarse admission
//! rules before anything reaches the dispatcher.
//!
//! The broker rejects:
//!
//! - messages whose MTI names a leg the switch does not accept inbound,
//! - messages from channels not admitted for their category,
//! - messages missing mandatory slots for their category,
//! - duplicate trace keys inside the suppression window.
//!
//! Admission failure routes the message to the null router. It never
//! reaches the authorizer; the broker does not decide destinations, only
//! whether and with what classification a message may proceed.

pub mod admission;
pub mod classify;
pub mod trace_cache;

pub use admission::{AdmissionConfig, AdmissionError, ChannelAdmission};
pub use classify::{extract_trace, AdmittedTransaction, Broker, Classification};
pub use trace_cache::TraceCache;
