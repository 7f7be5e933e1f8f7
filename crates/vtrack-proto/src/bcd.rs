//! Binary-coded decimal helpers for terminal ids and timestamps.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::CodecError;

/// Renders packed BCD bytes as a decimal string, high nibble first per byte.
/// A nibble value above 9 is skipped (padding convention), and leading
/// zeros are stripped from the result.
#[must_use]
pub fn bcd_to_string(bytes: &[u8]) -> String {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let high = byte >> 4;
        let low = byte & 0x0F;
        if high <= 9 {
            digits.push((b'0' + high) as char);
        }
        if low <= 9 {
            digits.push((b'0' + low) as char);
        }
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}

/// Packs a decimal string into exactly 6 BCD bytes (terminal id layout).
/// Left-pads with '0' to 12 digits, keeps the rightmost 12 if longer, and
/// maps non-digit characters to 0.
#[must_use]
pub fn string_to_bcd6(value: &str) -> [u8; 6] {
    const DIGITS: usize = 12;

    let chars: Vec<char> = value.chars().collect();
    let mut padded = vec!['0'; DIGITS];
    let take = chars.len().min(DIGITS);
    let src_start = chars.len() - take;
    padded[DIGITS - take..].copy_from_slice(&chars[src_start..]);

    let mut out = [0u8; 6];
    for (i, pair) in padded.chunks(2).enumerate() {
        let high = pair[0].to_digit(10).unwrap_or(0) as u8;
        let low = pair[1].to_digit(10).unwrap_or(0) as u8;
        out[i] = (high << 4) | low;
    }
    out
}

/// Decodes a 6-byte packed-BCD `YY MM DD hh mm ss` timestamp as UTC.
///
/// Two-digit years below 80 map to `2000 + YY`; years 80 and above map to
/// `1900 + YY`, matching the firmware's century convention.
///
/// # Errors
///
/// Returns [`CodecError::Length`] if any field decodes to an out-of-range
/// calendar value (e.g. month 13, day 32, hour 25).
pub fn bcd_datetime(bytes: [u8; 6]) -> Result<DateTime<Utc>, CodecError> {
    let field = |b: u8| -> u32 { u32::from((b >> 4) * 10 + (b & 0x0F)) };

    let yy = field(bytes[0]);
    let year = if yy < 80 { 2000 + yy } else { 1900 + yy };
    let month = field(bytes[1]);
    let day = field(bytes[2]);
    let hour = field(bytes[3]);
    let minute = field(bytes[4]);
    let second = field(bytes[5]);

    Utc.with_ymd_and_hms(year as i32, month, day, hour, minute, second)
        .single()
        .ok_or_else(|| {
            CodecError::Length(format!(
                "invalid BCD timestamp {year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bcd_to_string_strips_leading_zeros() {
        assert_eq!(bcd_to_string(&[0x00, 0x12, 0x34, 0x56, 0x78, 0x90]), "1234567890");
    }

    #[test]
    fn bcd_to_string_all_zero_is_zero() {
        assert_eq!(bcd_to_string(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]), "0");
    }

    #[test]
    fn century_rule() {
        let dt = bcd_datetime([0x24, 0x03, 0x15, 0x12, 0x30, 0x45]).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-15T12:30:45+00:00");

        let dt = bcd_datetime([0x85, 0x01, 0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(dt.format("%Y").to_string(), "1985");
    }

    proptest! {
        #[test]
        fn terminal_id_round_trip(digits in prop::collection::vec(0u8..10, 1..=12)) {
            let text: String = digits.iter().map(|d| (b'0' + d) as char).collect();
            let bcd = string_to_bcd6(&text);
            let decoded = bcd_to_string(&bcd);

            let expected = text.trim_start_matches('0');
            let expected = if expected.is_empty() { "0" } else { expected };
            prop_assert_eq!(decoded, expected);
        }
    }
}
