//! Response construction.
//!
//! A response mirrors the request's trace-bearing slots so the caller can
//! correlate it, flips the MTI to the response leg, and adds the response
//! code in slot 39.

use shared_types::message::slots;
use shared_types::{FieldValue, ResponseCode, TransactionMessage};

/// Slots copied from request to response for correlation and audit.
const MIRRORED_SLOTS: [u16; 7] = [
    slots::ACCOUNT_REF,
    slots::PROCESSING_CODE,
    slots::AMOUNT,
    slots::TIMESTAMP,
    slots::STAN,
    slots::TERMINAL_ID,
    slots::CURRENCY,
];

/// Builds the response message for `request` carrying `code`.
#[must_use]
pub fn response_for(request: &TransactionMessage, code: ResponseCode) -> TransactionMessage {
    let mut response = TransactionMessage::new(request.mti.response());
    for slot in MIRRORED_SLOTS {
        if let Some(value) = request.get(slot) {
            let _ = response.set(slot, value.clone());
        }
    }
    let _ = response.set(
        slots::RESPONSE_CODE,
        FieldValue::Text {
            value: code.wire_code().to_owned(),
            width: 2,
        },
    );
    response
}
