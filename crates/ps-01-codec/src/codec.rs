//! Wire-format encode/decode.
//!
//! Both directions are pure functions over byte slices and the canonical
//! [`TransactionMessage`]; neither touches I/O or shared state.

use shared_types::message::{slots, FieldValue, MessageCategory, MessageFunction, MessageOrigin, Mti};
use shared_types::TransactionMessage;

use crate::errors::FormatError;
use crate::layout::{slot_kind, SlotKind};

/// Size of one presence-bitmap unit in bytes.
const BITMAP_UNIT: usize = 8;

/// Slots covered by one bitmap unit (bit 1 of each unit is the
/// continuation bit, so a unit carries 63 data slots).
const SLOTS_PER_UNIT: u16 = 64;

/// Hard cap on chained bitmap units. Anything past the second unit names
/// slots the layout cannot declare, so longer chains are rejected outright.
const MAX_BITMAP_UNITS: usize = 2;

// =============================================================================
// DECODE
// =============================================================================

/// Decodes a wire frame into a structured message.
///
/// # Errors
///
/// Returns a [`FormatError`] for any structural defect; never panics on
/// arbitrary input.
pub fn decode(input: &[u8]) -> Result<TransactionMessage, FormatError> {
    let mut offset = 0usize;

    let mti = decode_mti(input, &mut offset)?;
    let present = decode_bitmap(input, &mut offset)?;

    let mut message = TransactionMessage::new(mti);
    for slot in present {
        let kind = slot_kind(slot).ok_or(FormatError::UnknownSlot { slot })?;
        let value = decode_field(input, &mut offset, slot, kind)?;
        // Slots below 2 never appear in `present`; set cannot refuse here.
        let _ = message.set(slot, value);
    }

    if offset != input.len() {
        return Err(FormatError::TrailingBytes(input.len() - offset));
    }
    Ok(message)
}

fn decode_mti(input: &[u8], offset: &mut usize) -> Result<Mti, FormatError> {
    let raw = take(input, offset, 4)?;
    let digits: Vec<u8> = raw
        .iter()
        .map(|b| b.checked_sub(b'0').filter(|d| *d <= 9))
        .collect::<Option<_>>()
        .ok_or_else(|| FormatError::UnknownMti {
            mti: String::from_utf8_lossy(raw).into_owned(),
        })?;

    let unknown = || FormatError::UnknownMti {
        mti: String::from_utf8_lossy(raw).into_owned(),
    };
    if digits[0] != Mti::CURRENT_VERSION {
        return Err(unknown());
    }
    Ok(Mti {
        version: digits[0],
        category: MessageCategory::from_code(digits[1]).ok_or_else(unknown)?,
        function: MessageFunction::from_code(digits[2]).ok_or_else(unknown)?,
        origin: MessageOrigin::from_code(digits[3]).ok_or_else(unknown)?,
    })
}

/// Reads the chained bitmap units and returns the present data slots in
/// ascending order.
fn decode_bitmap(input: &[u8], offset: &mut usize) -> Result<Vec<u16>, FormatError> {
    let mut present = Vec::new();
    let mut unit_index = 0usize;
    loop {
        let unit = take(input, offset, BITMAP_UNIT)?;
        let base = unit_index as u16 * SLOTS_PER_UNIT;
        let mut continuation = false;

        for bit in 0..(SLOTS_PER_UNIT as usize) {
            if unit[bit / 8] & (0x80 >> (bit % 8)) == 0 {
                continue;
            }
            let slot = base + bit as u16 + 1;
            if bit == 0 {
                // First bit of every unit announces another unit, it is
                // never a data slot.
                continuation = true;
            } else if slot > slots::MAX_SLOT {
                return Err(FormatError::UnknownSlot { slot });
            } else {
                present.push(slot);
            }
        }

        unit_index += 1;
        if !continuation {
            break;
        }
        if unit_index >= MAX_BITMAP_UNITS {
            return Err(FormatError::UnknownSlot {
                slot: (unit_index as u16 + 1) * SLOTS_PER_UNIT + 1,
            });
        }
    }
    Ok(present)
}

fn decode_field(
    input: &[u8],
    offset: &mut usize,
    slot: u16,
    kind: SlotKind,
) -> Result<FieldValue, FormatError> {
    match kind {
        SlotKind::Numeric { width } => {
            let raw = take(input, offset, width as usize)?;
            let mut value: u64 = 0;
            for byte in raw {
                let digit = byte
                    .checked_sub(b'0')
                    .filter(|d| *d <= 9)
                    .ok_or(FormatError::NonNumeric { slot })?;
                value = value * 10 + u64::from(digit);
            }
            Ok(FieldValue::Numeric { value, width })
        }
        SlotKind::Text { width } => {
            let raw = take(input, offset, width as usize)?;
            if raw.iter().any(|b| !(0x20..=0x7e).contains(b)) {
                return Err(FormatError::NonPrintable { slot });
            }
            let text = std::str::from_utf8(raw)
                .map_err(|_| FormatError::NonPrintable { slot })?
                .trim_end_matches(' ')
                .to_owned();
            Ok(FieldValue::Text { value: text, width })
        }
        SlotKind::Variable { max } => {
            let prefix = take(input, offset, 2)?;
            let mut declared = 0usize;
            for byte in prefix {
                let digit = byte
                    .checked_sub(b'0')
                    .filter(|d| *d <= 9)
                    .ok_or(FormatError::NonNumeric { slot })?;
                declared = declared * 10 + digit as usize;
            }
            if declared > max {
                return Err(FormatError::FieldTooLong {
                    slot,
                    length: declared,
                    max,
                });
            }
            let remaining = input.len() - *offset;
            if declared > remaining {
                return Err(FormatError::BadLengthPrefix {
                    slot,
                    declared,
                    remaining,
                });
            }
            let data = take(input, offset, declared)?;
            Ok(FieldValue::Variable(data.to_vec()))
        }
    }
}

fn take<'a>(input: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8], FormatError> {
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= input.len())
        .ok_or(FormatError::UnexpectedEof { offset: *offset })?;
    let slice = &input[*offset..end];
    *offset = end;
    Ok(slice)
}

// =============================================================================
// ENCODE
// =============================================================================

/// Serializes a structured message to its wire frame.
///
/// # Errors
///
/// Fails when a field value contradicts its slot's declared kind or width;
/// a message built only through the typed constructors encodes cleanly.
pub fn encode(message: &TransactionMessage) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::with_capacity(4 + BITMAP_UNIT + message.len() * 8);

    out.extend_from_slice(message.mti.to_string().as_bytes());

    let mut bitmap = [0u8; BITMAP_UNIT];
    for slot in message.present_slots() {
        // Slot numbers are already bounded to 2..=64 by TransactionMessage.
        let bit = (slot - 1) as usize;
        bitmap[bit / 8] |= 0x80 >> (bit % 8);
    }
    out.extend_from_slice(&bitmap);

    for (slot, value) in message.iter() {
        let kind = slot_kind(slot).ok_or(FormatError::UnknownSlot { slot })?;
        encode_field(&mut out, slot, kind, value)?;
    }
    Ok(out)
}

fn encode_field(
    out: &mut Vec<u8>,
    slot: u16,
    kind: SlotKind,
    value: &FieldValue,
) -> Result<(), FormatError> {
    match (kind, value) {
        (SlotKind::Numeric { width }, FieldValue::Numeric { value, width: stored }) => {
            if *stored != width {
                return Err(FormatError::TypeMismatch { slot });
            }
            let rendered = format!("{value:0>width$}", width = width as usize);
            if rendered.len() != width as usize {
                return Err(FormatError::ValueOverflow { slot, width });
            }
            out.extend_from_slice(rendered.as_bytes());
            Ok(())
        }
        (SlotKind::Text { width }, FieldValue::Text { value, width: stored }) => {
            if *stored != width || value.len() > width as usize {
                return Err(FormatError::TypeMismatch { slot });
            }
            if value.bytes().any(|b| !(0x20..=0x7e).contains(&b)) {
                return Err(FormatError::NonPrintable { slot });
            }
            out.extend_from_slice(value.as_bytes());
            out.extend(std::iter::repeat(b' ').take(width as usize - value.len()));
            Ok(())
        }
        (SlotKind::Variable { max }, FieldValue::Variable(data)) => {
            if data.len() > max || data.len() > 99 {
                return Err(FormatError::FieldTooLong {
                    slot,
                    length: data.len(),
                    max,
                });
            }
            out.extend_from_slice(format!("{:02}", data.len()).as_bytes());
            out.extend_from_slice(data);
            Ok(())
        }
        _ => Err(FormatError::TypeMismatch { slot }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::Rng;
    use shared_types::message::slots;

    fn financial_request() -> TransactionMessage {
        TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
        .with(slots::ACCOUNT_REF, FieldValue::Variable(b"4532015112830366".to_vec()))
        .with(slots::PROCESSING_CODE, FieldValue::Numeric { value: 1_000, width: 6 })
        .with(slots::AMOUNT, FieldValue::Numeric { value: 12_345, width: 12 })
        .with(slots::TIMESTAMP, FieldValue::Numeric { value: 1_700_000_000, width: 10 })
        .with(slots::STAN, FieldValue::Numeric { value: 123_456, width: 6 })
        .with(slots::TERMINAL_ID, FieldValue::Text { value: "TERM0001".into(), width: 8 })
        .with(slots::CURRENCY, FieldValue::Numeric { value: 840, width: 3 })
    }

    #[test]
    fn round_trip_fixed_message() {
        let msg = financial_request();
        let wire = encode(&msg).expect("encode");
        let decoded = decode(&wire).expect("decode");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trip_generated_messages() {
        let mut rng = rand::thread_rng();
        let declared: Vec<u16> = (2..=slots::MAX_SLOT).filter(|s| slot_kind(*s).is_some()).collect();

        for _ in 0..200 {
            let mut msg = TransactionMessage::new(Mti::new(
                *[
                    MessageCategory::Authorization,
                    MessageCategory::Financial,
                    MessageCategory::Reversal,
                    MessageCategory::Network,
                ]
                .choose(&mut rng)
                .unwrap(),
                *[MessageFunction::Request, MessageFunction::Response, MessageFunction::Advice]
                    .choose(&mut rng)
                    .unwrap(),
                *[MessageOrigin::Acquirer, MessageOrigin::Issuer, MessageOrigin::Switch]
                    .choose(&mut rng)
                    .unwrap(),
            ));
            for &slot in &declared {
                if rng.gen_bool(0.5) {
                    continue;
                }
                let value = match slot_kind(slot).unwrap() {
                    SlotKind::Numeric { width } => {
                        let cap = 10u64.saturating_pow(u32::from(width).min(12));
                        FieldValue::Numeric { value: rng.gen_range(0..cap), width }
                    }
                    SlotKind::Text { width } => {
                        let len = rng.gen_range(0..=width as usize);
                        // Printable, no trailing spaces (wire canonical form).
                        let mut value: String =
                            (0..len).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
                        value.truncate(width as usize);
                        FieldValue::Text { value, width }
                    }
                    SlotKind::Variable { max } => {
                        let len = rng.gen_range(0..=max);
                        FieldValue::Variable((0..len).map(|_| rng.gen::<u8>()).collect())
                    }
                };
                assert!(msg.set(slot, value));
            }
            let wire = encode(&msg).expect("encode");
            assert_eq!(decode(&wire).expect("decode"), msg);
        }
    }

    #[test]
    fn truncated_input_is_rejected_not_panicking() {
        let wire = encode(&financial_request()).expect("encode");
        for cut in 0..wire.len() {
            let err = decode(&wire[..cut]);
            assert!(err.is_err(), "truncation at {cut} must fail");
        }
    }

    #[test]
    fn presence_bit_without_data_fails() {
        let mut wire = encode(&financial_request()).expect("encode");
        // Mark slot 42 (merchant id) present without appending its data.
        let bit = 42 - 1;
        wire[4 + bit / 8] |= 0x80 >> (bit % 8);
        // The phantom slot swallows the following slot's digits as its
        // length prefix, so the exact error depends on what it consumes;
        // any structural error short of a decoded message is correct.
        let err = decode(&wire).expect_err("phantom presence bit must not decode");
        assert!(matches!(
            err,
            FormatError::UnexpectedEof { .. }
                | FormatError::NonNumeric { .. }
                | FormatError::FieldTooLong { .. }
                | FormatError::BadLengthPrefix { .. }
        ));
    }

    #[test]
    fn length_prefix_overrun_fails() {
        let msg = TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
        .with(slots::ACCOUNT_REF, FieldValue::Variable(b"45".to_vec()));
        let mut wire = encode(&msg).expect("encode");
        // Inflate the declared LLVAR length beyond the remaining buffer.
        let prefix_at = wire.len() - 4; // "02" + 2 data bytes
        wire[prefix_at] = b'1';
        wire[prefix_at + 1] = b'9';
        assert!(matches!(
            decode(&wire),
            Err(FormatError::BadLengthPrefix { slot: 2, declared: 19, .. })
        ));
    }

    #[test]
    fn unknown_slot_bit_fails() {
        let mut wire = encode(&financial_request()).expect("encode");
        // Slot 63 carries no declared kind.
        let bit = 63 - 1;
        wire[4 + bit / 8] |= 0x80 >> (bit % 8);
        assert_eq!(decode(&wire), Err(FormatError::UnknownSlot { slot: 63 }));
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut wire = encode(&financial_request()).expect("encode");
        wire.push(0x00);
        assert_eq!(decode(&wire), Err(FormatError::TrailingBytes(1)));
    }

    #[test]
    fn unknown_mti_fails() {
        let mut wire = encode(&financial_request()).expect("encode");
        wire[1] = b'7'; // no category maps to 7
        assert!(matches!(decode(&wire), Err(FormatError::UnknownMti { .. })));
    }

    #[test]
    fn continuation_bit_with_unknown_high_slot_fails() {
        let mut wire = encode(&financial_request()).expect("encode");
        // Announce a second bitmap unit claiming slot 66.
        wire[4] |= 0x80;
        let mut second = [0u8; 8];
        second[0] |= 0x80 >> 1; // slot 66
        // Insert the unit right after the first one.
        let insert_at = 4 + 8;
        for (i, byte) in second.iter().enumerate() {
            wire.insert(insert_at + i, *byte);
        }
        assert_eq!(decode(&wire), Err(FormatError::UnknownSlot { slot: 66 }));
    }

    #[test]
    fn encode_rejects_type_mismatch() {
        let msg = TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
        .with(slots::AMOUNT, FieldValue::Variable(vec![1, 2, 3]));
        assert_eq!(encode(&msg), Err(FormatError::TypeMismatch { slot: 4 }));
    }

    #[test]
    fn encode_rejects_overflowing_numeric() {
        let msg = TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
        .with(slots::CURRENCY, FieldValue::Numeric { value: 1_000, width: 3 });
        assert_eq!(
            encode(&msg),
            Err(FormatError::ValueOverflow { slot: 49, width: 3 })
        );
    }

    #[test]
    fn encode_rejects_oversized_variable() {
        let msg = TransactionMessage::new(Mti::new(
            MessageCategory::Financial,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
        .with(slots::ACCOUNT_REF, FieldValue::Variable(vec![0u8; 20]));
        assert!(matches!(
            encode(&msg),
            Err(FormatError::FieldTooLong { slot: 2, length: 20, max: 19 })
        ));
    }
}
