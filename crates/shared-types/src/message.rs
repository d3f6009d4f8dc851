//! # Canonical Transaction Message
//!
//! The in-memory form of a switch message: a message-type indicator (MTI)
//! plus a slot-number → typed-value mapping. The wire form (presence bitmap,
//! fixed and length-prefixed fields) is handled by the codec subsystem; this
//! module only defines the structured record and its invariants.
//!
//! ## Invariants
//!
//! - Every slot present in the map holds exactly one value of the declared
//!   type for that slot.
//! - Slot 1 is the presence indicator itself on the wire and is never a
//!   data slot; `set` rejects slots 0 and 1.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// WELL-KNOWN SLOT NUMBERS
// =============================================================================

/// Well-known slot numbers used across the switch.
///
/// The numbering follows the conventional card-message layout: low slots for
/// account and amount data, slot 11 for the trace number, slot 39 for the
/// response code.
pub mod slots {
    /// Primary account reference (LLVAR, up to 19 digits).
    pub const ACCOUNT_REF: u16 = 2;
    /// Processing code: transaction type (fixed 6 digits).
    pub const PROCESSING_CODE: u16 = 3;
    /// Transaction amount in minor units (fixed 12 digits).
    pub const AMOUNT: u16 = 4;
    /// Transmission timestamp, seconds since epoch (fixed 10 digits).
    pub const TIMESTAMP: u16 = 7;
    /// System Trace Audit Number (fixed 6 digits).
    pub const STAN: u16 = 11;
    /// Response code (fixed 2 characters).
    pub const RESPONSE_CODE: u16 = 39;
    /// Terminal identifier (fixed 8 characters).
    pub const TERMINAL_ID: u16 = 41;
    /// Merchant identifier (LLVAR, up to 15 characters).
    pub const MERCHANT_ID: u16 = 42;
    /// Currency code, ISO numeric (fixed 3 digits).
    pub const CURRENCY: u16 = 49;
    /// Merchant category class (fixed 4 digits).
    pub const MERCHANT_CLASS: u16 = 18;

    /// Highest slot number the switch understands.
    pub const MAX_SLOT: u16 = 64;
}

// =============================================================================
// MESSAGE-TYPE INDICATOR
// =============================================================================

/// Message category: what kind of operation the message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCategory {
    /// Authorization request (hold funds, no ledger movement).
    Authorization,
    /// Financial request (moves funds on approval).
    Financial,
    /// Reversal of a prior financial request.
    Reversal,
    /// Network management (echo, sign-on).
    Network,
}

impl MessageCategory {
    /// Wire digit for the category position of the MTI.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Authorization => 1,
            Self::Financial => 2,
            Self::Reversal => 4,
            Self::Network => 8,
        }
    }

    /// Parses the category digit. Unknown digits are rejected by the broker.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Authorization),
            2 => Some(Self::Financial),
            4 => Some(Self::Reversal),
            8 => Some(Self::Network),
            _ => None,
        }
    }
}

/// Message function: request or response leg of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageFunction {
    /// Request leg, expects a response.
    Request,
    /// Response leg, mirrors the request trace key.
    Response,
    /// Advice: notification of a completed action, no approval sought.
    Advice,
}

impl MessageFunction {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Request => 0,
            Self::Response => 1,
            Self::Advice => 2,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Request),
            1 => Some(Self::Response),
            2 => Some(Self::Advice),
            _ => None,
        }
    }
}

/// Message origin: which side of the switch initiated the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageOrigin {
    /// Acquirer-side device (ATM, POS terminal, e-commerce gateway).
    Acquirer,
    /// Issuer-side processor.
    Issuer,
    /// The switch itself (synthesized reversals, network management).
    Switch,
}

impl MessageOrigin {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Acquirer => 0,
            Self::Issuer => 1,
            Self::Switch => 2,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Acquirer),
            1 => Some(Self::Issuer),
            2 => Some(Self::Switch),
            _ => None,
        }
    }
}

/// Message-type indicator: version + category + function + origin.
///
/// Encoded on the wire as four bytes, one per position. `version` is the
/// protocol generation and must match [`Mti::CURRENT_VERSION`] for the
/// broker to admit the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mti {
    /// Protocol generation digit.
    pub version: u8,
    /// Operation kind.
    pub category: MessageCategory,
    /// Request/response/advice leg.
    pub function: MessageFunction,
    /// Initiating side.
    pub origin: MessageOrigin,
}

impl Mti {
    /// Protocol generation this switch speaks.
    pub const CURRENT_VERSION: u8 = 1;

    /// Convenience constructor for the current protocol generation.
    #[must_use]
    pub fn new(category: MessageCategory, function: MessageFunction, origin: MessageOrigin) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            category,
            function,
            origin,
        }
    }

    /// The response MTI matching this request: same category, response
    /// function, switch origin.
    #[must_use]
    pub fn response(self) -> Self {
        Self {
            version: self.version,
            category: self.category,
            function: MessageFunction::Response,
            origin: MessageOrigin::Switch,
        }
    }
}

impl std::fmt::Display for Mti {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.version,
            self.category.code(),
            self.function.code(),
            self.origin.code()
        )
    }
}

// =============================================================================
// FIELD VALUES
// =============================================================================

/// A typed slot value.
///
/// The declared type per slot is fixed by the wire layout; the codec rejects
/// messages whose bytes do not parse as the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Fixed-width numeric field (digits only), stored with its width.
    Numeric { value: u64, width: u8 },
    /// Fixed-width text field, space-padded on the wire.
    Text { value: String, width: u8 },
    /// Length-prefixed variable data (LLVAR).
    Variable(Vec<u8>),
}

impl FieldValue {
    /// Numeric value if this field is numeric.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Numeric { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Text value if this field is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Raw bytes if this field is variable-length.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Variable(bytes) => Some(bytes),
            _ => None,
        }
    }
}

// =============================================================================
// TRANSACTION MESSAGE
// =============================================================================

/// A structurally complete switch message.
///
/// The presence indicator of the wire form is derived from the key set of
/// `fields`; a slot is "present" exactly when the map holds a value for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMessage {
    /// Message-type indicator.
    pub mti: Mti,
    /// Slot number → typed value. Keys are always >= 2.
    fields: BTreeMap<u16, FieldValue>,
}

impl TransactionMessage {
    /// Creates an empty message with the given MTI.
    #[must_use]
    pub fn new(mti: Mti) -> Self {
        Self {
            mti,
            fields: BTreeMap::new(),
        }
    }

    /// Sets a slot value. Returns `false` (and leaves the message unchanged)
    /// for reserved slots 0 and 1 and for slots beyond the layout maximum.
    pub fn set(&mut self, slot: u16, value: FieldValue) -> bool {
        if slot < 2 || slot > slots::MAX_SLOT {
            return false;
        }
        self.fields.insert(slot, value);
        true
    }

    /// Builder-style `set` for test and adapter construction.
    #[must_use]
    pub fn with(mut self, slot: u16, value: FieldValue) -> Self {
        let _ = self.set(slot, value);
        self
    }

    /// Value stored at `slot`, if present.
    #[must_use]
    pub fn get(&self, slot: u16) -> Option<&FieldValue> {
        self.fields.get(&slot)
    }

    /// Whether `slot` carries a value.
    #[must_use]
    pub fn has(&self, slot: u16) -> bool {
        self.fields.contains_key(&slot)
    }

    /// Removes a slot value.
    pub fn clear(&mut self, slot: u16) -> Option<FieldValue> {
        self.fields.remove(&slot)
    }

    /// Ordered iterator over present slots.
    pub fn present_slots(&self) -> impl Iterator<Item = u16> + '_ {
        self.fields.keys().copied()
    }

    /// Ordered iterator over (slot, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &FieldValue)> {
        self.fields.iter().map(|(slot, value)| (*slot, value))
    }

    /// Number of present slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no slots are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    // -------------------------------------------------------------------------
    // Typed accessors for well-known slots
    // -------------------------------------------------------------------------

    /// Transaction amount in minor units (slot 4).
    #[must_use]
    pub fn amount(&self) -> Option<u64> {
        self.get(slots::AMOUNT).and_then(FieldValue::as_u64)
    }

    /// System Trace Audit Number (slot 11).
    #[must_use]
    pub fn stan(&self) -> Option<u32> {
        self.get(slots::STAN)
            .and_then(FieldValue::as_u64)
            .map(|v| v as u32)
    }

    /// Primary account reference digits (slot 2).
    #[must_use]
    pub fn account_ref(&self) -> Option<&str> {
        self.get(slots::ACCOUNT_REF)
            .and_then(FieldValue::as_bytes)
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    /// ISO numeric currency code (slot 49).
    #[must_use]
    pub fn currency(&self) -> Option<u16> {
        self.get(slots::CURRENCY)
            .and_then(FieldValue::as_u64)
            .map(|v| v as u16)
    }

    /// Merchant category class (slot 18).
    #[must_use]
    pub fn merchant_class(&self) -> Option<u16> {
        self.get(slots::MERCHANT_CLASS)
            .and_then(FieldValue::as_u64)
            .map(|v| v as u16)
    }

    /// Transmission timestamp, seconds since epoch (slot 7).
    #[must_use]
    pub fn timestamp(&self) -> Option<u64> {
        self.get(slots::TIMESTAMP).and_then(FieldValue::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_slots_are_rejected() {
        let mut msg = TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ));
        assert!(!msg.set(0, FieldValue::Variable(vec![1])));
        assert!(!msg.set(1, FieldValue::Variable(vec![1])));
        assert!(!msg.set(slots::MAX_SLOT + 1, FieldValue::Variable(vec![1])));
        assert!(msg.is_empty());
    }

    #[test]
    fn typed_accessors_read_well_known_slots() {
        let msg = TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
        .with(slots::AMOUNT, FieldValue::Numeric { value: 2500, width: 12 })
        .with(slots::STAN, FieldValue::Numeric { value: 123_456, width: 6 })
        .with(slots::ACCOUNT_REF, FieldValue::Variable(b"4532015112830366".to_vec()));

        assert_eq!(msg.amount(), Some(2500));
        assert_eq!(msg.stan(), Some(123_456));
        assert_eq!(msg.account_ref(), Some("4532015112830366"));
        assert_eq!(msg.currency(), None);
    }

    #[test]
    fn response_mti_flips_function_and_origin() {
        let mti = Mti::new(
            MessageCategory::Authorization,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        );
        let resp = mti.response();
        assert_eq!(resp.category, MessageCategory::Authorization);
        assert_eq!(resp.function, MessageFunction::Response);
        assert_eq!(resp.origin, MessageOrigin::Switch);
        assert_eq!(resp.to_string(), "1112");
    }

    #[test]
    fn present_slots_are_ordered() {
        let msg = TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
        .with(slots::CURRENCY, FieldValue::Numeric { value: 840, width: 3 })
        .with(slots::ACCOUNT_REF, FieldValue::Variable(vec![0x31]))
        .with(slots::STAN, FieldValue::Numeric { value: 1, width: 6 });

        let present: Vec<u16> = msg.present_slots().collect();
        assert_eq!(present, vec![slots::ACCOUNT_REF, slots::STAN, slots::CURRENCY]);
    }
}
