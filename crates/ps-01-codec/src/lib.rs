//! # Message Codec Subsystem
//!
//! Parses and serializes the switch wire format:
//!
//! ```text
//! ┌──────────┬───────────────────────┬──────────────────────────────┐
//! │ MTI      │ presence bitmap       │ field values (ascending slot)│
//! │ 4 digits │ 8-byte units,         │ fixed width or LLVAR         │
//! │          │ continuation bit      │ (2-digit length prefix)      │
//! └──────────┴───────────────────────┴──────────────────────────────┘
//! ```
//!
//! Decoding is a pure function and never panics on arbitrary input: a
//! presence bit with no data, a length prefix that overruns the buffer, an
//! unknown slot, or trailing bytes all fail with a typed [`FormatError`].
//!
//! Round-trip property: `decode(&encode(&m)?) == m` for every structurally
//! valid `m` (declared slot types respected, slots 2..=64).

pub mod codec;
pub mod errors;
pub mod layout;
pub mod response;

pub use codec::{decode, encode};
pub use errors::FormatError;
pub use layout::{slot_kind, SlotKind};
pub use response::response_for;
