//! Codec error types.

use thiserror::Error;

/// Structural failures raised while decoding or encoding a message.
///
/// Every variant maps to the `failed:format-error` outcome at the boundary;
/// none of them is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The buffer ended before the announced data did.
    #[error("Unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// The MTI digits do not name a known version/category/function/origin.
    #[error("Unknown message-type indicator: {mti}")]
    UnknownMti { mti: String },

    /// A presence bit referenced a slot outside the layout.
    #[error("Unknown slot {slot} marked present")]
    UnknownSlot { slot: u16 },

    /// A fixed numeric field contained a non-digit byte.
    #[error("Non-numeric byte in numeric slot {slot}")]
    NonNumeric { slot: u16 },

    /// A variable-length prefix was malformed or exceeded the remaining buffer.
    #[error("Bad length prefix in slot {slot}: declared {declared}, remaining {remaining}")]
    BadLengthPrefix {
        slot: u16,
        declared: usize,
        remaining: usize,
    },

    /// A variable field exceeded the maximum length declared for its slot.
    #[error("Slot {slot} data of {length} bytes exceeds maximum {max}")]
    FieldTooLong { slot: u16, length: usize, max: usize },

    /// Input remained after all present slots were consumed.
    #[error("{0} trailing bytes after last field")]
    TrailingBytes(usize),

    /// A text field contained bytes outside the printable ASCII range.
    #[error("Non-printable byte in text slot {slot}")]
    NonPrintable { slot: u16 },

    /// A field value's type does not match the slot's declared kind
    /// (encode-side only).
    #[error("Value type mismatch for slot {slot}")]
    TypeMismatch { slot: u16 },

    /// A numeric value does not fit the slot's declared width (encode-side
    /// only).
    #[error("Value for slot {slot} does not fit width {width}")]
    ValueOverflow { slot: u16, width: u8 },
}
