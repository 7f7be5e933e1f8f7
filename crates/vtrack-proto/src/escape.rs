//! Transparent-byte escaping.
//!
//! Keeps the frame delimiter (0x7E) and the escape byte itself (0x7D) from
//! appearing inside a frame's interior: 0x7E becomes 0x7D 0x02, 0x7D becomes
//! 0x7D 0x01. Applies only to the interior between delimiters; the
//! delimiters themselves are never escaped because they are stripped before
//! this runs.

use crate::error::CodecError;

const DELIMITER: u8 = 0x7E;
const ESCAPE: u8 = 0x7D;
const ESCAPED_DELIMITER: u8 = 0x02;
const ESCAPED_ESCAPE: u8 = 0x01;

/// Reverses [`escape`]. `interior` must not contain the delimiter bytes
/// themselves (they are stripped by the reframer before this runs).
///
/// # Errors
///
/// Returns [`CodecError::Framing`] if a 0x7D is followed by anything other
/// than 0x01 or 0x02, or if a 0x7D is the last byte.
pub fn unescape(interior: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(interior.len());
    let mut iter = interior.iter().copied();

    while let Some(byte) = iter.next() {
        if byte == ESCAPE {
            match iter.next() {
                Some(ESCAPED_ESCAPE) => out.push(ESCAPE),
                Some(ESCAPED_DELIMITER) => out.push(DELIMITER),
                Some(other) => {
                    return Err(CodecError::Framing(format!(
                        "invalid escape sequence 0x7d {other:#04x}"
                    )));
                },
                None => {
                    return Err(CodecError::Framing("truncated escape sequence".to_string()));
                },
            }
        } else {
            out.push(byte);
        }
    }

    Ok(out)
}

/// Escapes `interior` for transmission: the inverse of [`unescape`].
#[must_use]
pub fn escape(interior: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(interior.len());
    for &byte in interior {
        match byte {
            DELIMITER => out.extend_from_slice(&[ESCAPE, ESCAPED_DELIMITER]),
            ESCAPE => out.extend_from_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            other => out.push(other),
        }
    }
    out
}
