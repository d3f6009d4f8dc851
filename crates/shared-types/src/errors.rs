//! # Shared Error Types
//!
//! Errors that cross subsystem boundaries. Component-local error enums live
//! in their own crates; only verification errors shared by every channel
//! adapter are defined here.

use thiserror::Error;

/// Errors related to envelope verification on a channel.
#[derive(Debug, Clone, Error)]
pub enum MessageError {
    /// Envelope version not supported.
    #[error("Unsupported version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u16, supported: u16 },

    /// Timestamp outside valid window.
    #[error("Timestamp out of range: {timestamp} not within valid window")]
    TimestampOutOfRange { timestamp: u64 },

    /// Replay attack detected.
    #[error("Replay detected: nonce {nonce} already seen")]
    ReplayDetected { nonce: String },

    /// HMAC tag did not verify.
    #[error("Invalid envelope tag")]
    InvalidTag,

    /// The peer claimed a channel identity with no configured key.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}
