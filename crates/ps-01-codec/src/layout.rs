//! Slot layout table.
//!
//! The declared kind of every slot the switch understands. The codec
//! consults this table in both directions; a slot absent from the table is
//! rejected at decode time and at encode time.

use shared_types::message::slots;

/// Declared wire kind of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Fixed-width numeric, zero-padded ASCII digits.
    Numeric { width: u8 },
    /// Fixed-width printable ASCII, space-padded.
    Text { width: u8 },
    /// Two-digit length prefix followed by raw bytes.
    Variable { max: usize },
}

/// Declared kind for `slot`, or `None` for slots the switch does not carry.
#[must_use]
pub fn slot_kind(slot: u16) -> Option<SlotKind> {
    match slot {
        slots::ACCOUNT_REF => Some(SlotKind::Variable { max: 19 }),
        slots::PROCESSING_CODE => Some(SlotKind::Numeric { width: 6 }),
        slots::AMOUNT => Some(SlotKind::Numeric { width: 12 }),
        slots::TIMESTAMP => Some(SlotKind::Numeric { width: 10 }),
        slots::STAN => Some(SlotKind::Numeric { width: 6 }),
        slots::MERCHANT_CLASS => Some(SlotKind::Numeric { width: 4 }),
        slots::RESPONSE_CODE => Some(SlotKind::Text { width: 2 }),
        slots::TERMINAL_ID => Some(SlotKind::Text { width: 8 }),
        slots::MERCHANT_ID => Some(SlotKind::Variable { max: 15 }),
        slots::CURRENCY => Some(SlotKind::Numeric { width: 3 }),
        _ => None,
    }
}
