//! Response builder: platform general response (0x8001) and terminal
//! registration response (0x8100), fully sealed for the wire.

use crate::{checksum, escape, header::Header};

/// Message id for the platform general response.
pub const MSG_ID_GENERAL_RESPONSE: u16 = 0x8001;
/// Message id for the terminal registration response.
pub const MSG_ID_REGISTRATION_RESPONSE: u16 = 0x8100;

/// Builds a sealed 0x8001 general-response frame acknowledging
/// `original_message_id`/`original_sequence`, addressed back to
/// `terminal_id` with the connection's own `outbound_sequence`.
#[must_use]
pub fn build_general_response(
    terminal_id: &str,
    outbound_sequence: u16,
    original_sequence: u16,
    original_message_id: u16,
    result: u8,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(5);
    body.extend_from_slice(&original_sequence.to_be_bytes());
    body.extend_from_slice(&original_message_id.to_be_bytes());
    body.push(result);

    seal(MSG_ID_GENERAL_RESPONSE, terminal_id, outbound_sequence, &body)
}

/// Builds a sealed 0x8100 registration-response frame carrying `token` as
/// the authentication token.
#[must_use]
pub fn build_registration_response(
    terminal_id: &str,
    outbound_sequence: u16,
    original_sequence: u16,
    result: u8,
    token: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(3 + token.len());
    body.extend_from_slice(&original_sequence.to_be_bytes());
    body.push(result);
    body.extend_from_slice(token.as_bytes());

    seal(MSG_ID_REGISTRATION_RESPONSE, terminal_id, outbound_sequence, &body)
}

fn seal(message_id: u16, terminal_id: &str, sequence: u16, body: &[u8]) -> Vec<u8> {
    let mut interior = Header::encode_outbound(message_id, terminal_id, sequence, body.len() as u16);
    interior.extend_from_slice(body);
    let sum = checksum::xor_checksum(&interior);
    interior.push(sum);

    let escaped = escape::escape(&interior);
    let mut frame = Vec::with_capacity(escaped.len() + 2);
    frame.push(0x7E);
    frame.extend_from_slice(&escaped);
    frame.push(0x7E);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{escape::unescape, header::Header};

    fn open_frame(frame: &[u8]) -> (Header, Vec<u8>) {
        assert_eq!(frame.first(), Some(&0x7E));
        assert_eq!(frame.last(), Some(&0x7E));
        let interior = unescape(&frame[1..frame.len() - 1]).unwrap();
        let (payload, checksum_byte) = interior.split_at(interior.len() - 1);
        assert_eq!(checksum::xor_checksum(payload), checksum_byte[0]);
        let (header, body) = Header::decode(payload).unwrap();
        (header, body.to_vec())
    }

    #[test]
    fn general_response_shape() {
        let frame = build_general_response("123456789010", 1, 1, 0x0002, 0);
        let (header, body) = open_frame(&frame);
        assert_eq!(header.message_id, MSG_ID_GENERAL_RESPONSE);
        assert_eq!(header.terminal_id, "123456789010");
        assert_eq!(body, vec![0x00, 0x01, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn registration_response_carries_token() {
        let frame = build_registration_response("123456789010", 7, 7, 0, "OK");
        let (header, body) = open_frame(&frame);
        assert_eq!(header.message_id, MSG_ID_REGISTRATION_RESPONSE);
        assert_eq!(body, vec![0x00, 0x07, 0x00, b'O', b'K']);
    }
}
