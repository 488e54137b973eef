//! BER length encoding and decoding.
//!
//! Length encoding follows X.690 Section 8.1.3:
//! - Short form: Single byte, bit 8=0, value 0-127
//! - Long form: Initial byte (bit 8=1, bits 7-1=count), followed by length bytes
//! - Indefinite form (0x80): Rejected, SNMP forbids it

use crate::error::{DecodeErrorKind, Error, Result};

/// Maximum length we'll accept.
///
/// 2MB is far larger than any realistic SNMP message, which keeps a corrupt length
/// field from driving a huge read.
pub const MAX_LENGTH: usize = 0x200000;

/// Encode a length value, returning the bytes in reverse order for prepending.
///
/// Uses short form for lengths <= 127, long form otherwise.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    let mut buf = [0u8; 5];

    if len <= 127 {
        buf[0] = len as u8;
        return (buf, 1);
    }

    let mut remaining = len;
    let mut count = 0;
    while remaining > 0 && count < 4 {
        buf[count] = remaining as u8;
        remaining >>= 8;
        count += 1;
    }
    buf[count] = 0x80 | count as u8;
    (buf, count + 1)
}

/// Number of octets the length header for `len` occupies.
pub fn length_encoded_len(len: usize) -> usize {
    encode_length(len).1
}

/// Decode a length from the start of `data`, returning (length, bytes_consumed).
///
/// The decoded length must fit in the bytes that follow the length field.
/// `base_offset` is only used to report error offsets relative to the
/// enclosing message.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first == 0x80 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::IndefiniteLength,
        ));
    }

    let (len, consumed) = if first & 0x80 == 0 {
        (first as usize, 1)
    } else {
        let num_octets = (first & 0x7F) as usize;

        if num_octets > 4 {
            return Err(Error::decode(
                base_offset,
                DecodeErrorKind::LengthTooLong { octets: num_octets },
            ));
        }

        let Some(octets) = data.get(1..1 + num_octets) else {
            return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
        };

        let len = octets
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);

        if len > MAX_LENGTH {
            return Err(Error::decode(
                base_offset,
                DecodeErrorKind::LengthExceedsMax {
                    length: len,
                    max: MAX_LENGTH,
                },
            ));
        }

        (len, 1 + num_octets)
    };

    let available = data.len() - consumed;
    if len > available {
        return Err(Error::decode(
            base_offset + consumed,
            DecodeErrorKind::InsufficientData {
                needed: len,
                available,
            },
        ));
    }

    Ok((len, consumed))
}
