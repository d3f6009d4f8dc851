//! Dispatcher-side failure taxonomy.

use thiserror::Error;

/// Failure of a single endpoint call, as seen by the fallback loop.
///
/// Every variant is a soft failure: the transaction itself is not refused,
/// the endpoint merely could not answer, so the loop may try the next
/// candidate with the same trace key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("endpoint call timed out")]
    Timeout,

    /// The call may or may not have reached the endpoint. Safe to retry
    /// only because retries carry the original trace key and downstream
    /// layers deduplicate on it.
    #[error("endpoint call outcome indeterminate: {0}")]
    Indeterminate(String),
}
