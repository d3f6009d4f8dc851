//! Channel error types.

use ps_01_codec::FormatError;
use shared_types::MessageError;
use thiserror::Error;

/// Errors surfaced by channel adapters.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Transport-level I/O failure before anything was written.
    #[error("Channel I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("Channel closed by peer")]
    Closed,

    /// A frame exceeded the configured maximum size.
    #[error("Frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// The envelope failed verification (version, window, replay, tag).
    #[error("Envelope rejected: {0}")]
    Verification(#[from] MessageError),

    /// The envelope payload failed structural decoding.
    #[error("Payload rejected: {0}")]
    Format(#[from] FormatError),

    /// The frame was not a parseable envelope at all.
    #[error("Malformed envelope frame: {0}")]
    MalformedEnvelope(String),

    /// The request was written but the response never arrived. The effect
    /// of the request is unknown; callers must treat it as indeterminate
    /// and run reversal logic, not assume either outcome.
    #[error("Request delivered but response not received")]
    Indeterminate,
}
