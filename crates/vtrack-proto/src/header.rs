//! Binary-variant header: message id, properties word, BCD terminal id,
//! sequence, and the optional subpackage pair.
//!
//! Operates on the unescaped interior with the trailing checksum byte
//! already stripped and verified by the caller.

use crate::{bcd, error::CodecError};

const FIXED_HEADER_LEN: usize = 12;
const SUBPACKAGE_HEADER_LEN: usize = 16;

const BODY_LENGTH_MASK: u16 = 0x03FF;
const SUBPACKAGE_FLAG_BIT: u16 = 1 << 13;

/// Decoded binary-variant header plus a view of the body slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Message id, e.g. 0x0200 for a location report.
    pub message_id: u16,
    /// Body length as declared by the properties word (low 10 bits).
    pub body_length: usize,
    /// Terminal id, BCD-decoded and left-zero-stripped.
    pub terminal_id: String,
    /// Outbound/inbound message sequence number.
    pub sequence: u16,
    /// `(total, index)` if the subpackage flag was set; not reassembled.
    pub subpackage: Option<(u16, u16)>,
}

impl Header {
    /// Decodes a header from `payload` (header + body, checksum already
    /// removed) and returns the header alongside the remaining body slice.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Length`] if `payload` is shorter than the minimum
    ///   12-byte (or 16-byte subpackaged) header, or the declared body
    ///   length does not match the bytes actually available.
    pub fn decode(payload: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        if payload.len() < FIXED_HEADER_LEN {
            return Err(CodecError::Length(format!(
                "header requires at least {FIXED_HEADER_LEN} bytes, got {}",
                payload.len()
            )));
        }

        let message_id = u16::from_be_bytes([payload[0], payload[1]]);
        let properties = u16::from_be_bytes([payload[2], payload[3]]);
        let body_length = usize::from(properties & BODY_LENGTH_MASK);
        let has_subpackage = properties & SUBPACKAGE_FLAG_BIT != 0;

        let terminal_id = bcd::bcd_to_string(&payload[4..10]);
        let sequence = u16::from_be_bytes([payload[10], payload[11]]);

        let (subpackage, body_offset) = if has_subpackage {
            if payload.len() < SUBPACKAGE_HEADER_LEN {
                return Err(CodecError::Length(format!(
                    "subpackaged header requires at least {SUBPACKAGE_HEADER_LEN} bytes, got {}",
                    payload.len()
                )));
            }
            let total = u16::from_be_bytes([payload[12], payload[13]]);
            let index = u16::from_be_bytes([payload[14], payload[15]]);
            (Some((total, index)), SUBPACKAGE_HEADER_LEN)
        } else {
            (None, FIXED_HEADER_LEN)
        };

        let body = &payload[body_offset..];
        if body.len() != body_length {
            return Err(CodecError::Length(format!(
                "declared body length {body_length} does not match available {} bytes",
                body.len()
            )));
        }

        Ok((Self { message_id, body_length, terminal_id, sequence, subpackage }, body))
    }

    /// Encodes a non-subpackaged outbound header (responses never set the
    /// subpackage flag).
    #[must_use]
    pub fn encode_outbound(message_id: u16, terminal_id: &str, sequence: u16, body_len: u16) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_HEADER_LEN);
        out.extend_from_slice(&message_id.to_be_bytes());
        out.extend_from_slice(&(body_len & BODY_LENGTH_MASK).to_be_bytes());
        out.extend_from_slice(&bcd::string_to_bcd6(terminal_id));
        out.extend_from_slice(&sequence.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fixed_header_with_empty_body() {
        let payload = [
            0x00, 0x02, // message id 0x0002 (heartbeat)
            0x00, 0x00, // properties: body length 0, no subpackage
            0x01, 0x23, 0x45, 0x67, 0x89, 0x01, // terminal BCD
            0x00, 0x01, // sequence 1
        ];
        let (header, body) = Header::decode(&payload).unwrap();
        assert_eq!(header.message_id, 0x0002);
        assert_eq!(header.body_length, 0);
        assert_eq!(header.sequence, 1);
        assert_eq!(header.subpackage, None);
        assert!(body.is_empty());
    }

    #[test]
    fn rejects_length_mismatch() {
        let payload = [
            0x02, 0x00, 0x00, 0x05, // claims 5 body bytes
            0x01, 0x23, 0x45, 0x67, 0x89, 0x01, 0x00, 0x01,
        ];
        assert!(matches!(Header::decode(&payload), Err(CodecError::Length(_))));
    }

    #[test]
    fn decodes_subpackage_pair_when_flag_set() {
        let mut payload = vec![
            0x02, 0x00, // message id
            0x20, 0x00, // bit 13 set, body length 0
            0x01, 0x23, 0x45, 0x67, 0x89, 0x01,
            0x00, 0x07, // sequence
            0x00, 0x03, 0x00, 0x01, // total=3, index=1
        ];
        let (header, body) = Header::decode(&payload).unwrap();
        assert_eq!(header.subpackage, Some((3, 1)));
        assert!(body.is_empty());
        payload.push(0xFF); // trailing byte would be the checksum, not part of header
        let _ = payload;
    }

    #[test]
    fn encode_outbound_round_trips_terminal_and_sequence() {
        let bytes = Header::encode_outbound(0x8001, "123456789010", 42, 0);
        let mut full = bytes.clone();
        full.extend_from_slice(&[]); // empty body
        let (header, body) = Header::decode(&full).unwrap();
        assert_eq!(header.message_id, 0x8001);
        assert_eq!(header.terminal_id, "123456789010");
        assert_eq!(header.sequence, 42);
        assert!(body.is_empty());
    }
}
