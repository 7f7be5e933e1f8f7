//! Legacy ASCII variant: `*HQ,<IMEI>,<CMD>,HHMMSS,A|V,DDMM.mmmm,N|S,...#`.
//!
//! Shares the same decoded-location event shape as the binary path so the
//! dispatcher can treat both uniformly (see [`crate::CodecError`] for the
//! shared error taxonomy).

use chrono::{DateTime, Utc};

use crate::{bcd, error::CodecError};

/// Whether the ASCII path's speed field is knots (converted ×1.852) or
/// already km/h. Firmware varies per fleet; see design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    /// Convert the speed field from knots to km/h (the default).
    Knots,
    /// Speed field is already km/h; no conversion.
    KmPerHour,
}

impl Default for SpeedUnit {
    fn default() -> Self {
        Self::Knots
    }
}

/// A decoded legacy ASCII location record.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiRecord {
    /// Terminal id, taken verbatim from the IMEI field.
    pub terminal_id: String,
    /// Command tag, e.g. "V1" or "LK".
    pub command: String,
    /// UTC timestamp reconstructed from DDMMYY + HHMMSS.
    pub timestamp: DateTime<Utc>,
    /// `true` for 'A' (valid fix), `false` for 'V'.
    pub valid: bool,
    /// Latitude in signed decimal degrees.
    pub latitude: f64,
    /// Longitude in signed decimal degrees.
    pub longitude: f64,
    /// Speed in km/h, one fractional digit.
    pub speed_kmh: f64,
    /// Heading field, carried through verbatim as the wire does not fix its
    /// units (course in degrees on most firmware).
    pub heading: String,
}

/// Parses one ASCII frame (including the leading `*` and trailing `#`).
///
/// # Errors
///
/// Returns [`CodecError::Framing`] if the delimiters or field count don't
/// match the expected layout, or [`CodecError::Length`] if a numeric field
/// fails to parse.
pub fn parse(frame: &[u8], speed_unit: SpeedUnit) -> Result<AsciiRecord, CodecError> {
    let text = std::str::from_utf8(frame)
        .map_err(|e| CodecError::Framing(format!("ascii frame is not valid utf-8: {e}")))?;

    let stripped = text
        .strip_prefix('*')
        .and_then(|s| s.strip_suffix('#'))
        .ok_or_else(|| CodecError::Framing("ascii frame missing '*'...'#' delimiters".to_string()))?;

    let fields: Vec<&str> = stripped.split(',').collect();
    // type, terminal id, command, HHMMSS, validity, lat, N/S, lon, E/W, speed, heading, DDMMYY, state, ...
    if fields.len() < 12 {
        return Err(CodecError::Length(format!(
            "ascii record expects at least 12 comma-separated fields, got {}",
            fields.len()
        )));
    }

    let terminal_id = fields[1].to_string();
    let command = fields[2].to_string();
    let hhmmss = fields[3];
    let valid = match fields[4] {
        "A" => true,
        "V" => false,
        other => return Err(CodecError::Framing(format!("invalid validity flag: {other}"))),
    };
    let latitude = parse_degrees_minutes(fields[5], fields[6])?;
    let longitude = parse_degrees_minutes(fields[7], fields[8])?;
    let speed_field: f64 = fields[9]
        .parse()
        .map_err(|_| CodecError::Length(format!("invalid speed field: {}", fields[9])))?;
    let speed_kmh = match speed_unit {
        SpeedUnit::Knots => round1(speed_field * 1.852),
        SpeedUnit::KmPerHour => round1(speed_field),
    };
    let heading = fields[10].to_string();
    let ddmmyy = fields[11];

    let timestamp = reconstruct_timestamp(ddmmyy, hhmmss)?;

    Ok(AsciiRecord { terminal_id, command, timestamp, valid, latitude, longitude, speed_kmh, heading })
}

/// Converts a DDMM.mmmm (or DDDMM.mmmm) field plus hemisphere letter into
/// signed decimal degrees, rounded to six fractional digits.
fn parse_degrees_minutes(field: &str, hemisphere: &str) -> Result<f64, CodecError> {
    let dot = field
        .find('.')
        .ok_or_else(|| CodecError::Length(format!("degrees-minutes field missing decimal point: {field}")))?;
    if dot < 2 {
        return Err(CodecError::Length(format!("degrees-minutes field too short: {field}")));
    }

    let (deg_and_min_int, _) = field.split_at(dot);
    let deg_digits = &deg_and_min_int[..dot - 2];
    let whole: f64 =
        field.parse().map_err(|_| CodecError::Length(format!("invalid degrees-minutes field: {field}")))?;
    let degrees: f64 = if deg_digits.is_empty() {
        0.0
    } else {
        deg_digits.parse().map_err(|_| CodecError::Length(format!("invalid degrees prefix: {field}")))?
    };
    let minutes = whole - degrees * 100.0;

    let decimal = degrees + minutes / 60.0;
    let signed = match hemisphere {
        "N" | "E" => decimal,
        "S" | "W" => -decimal,
        other => return Err(CodecError::Framing(format!("invalid hemisphere letter: {other}"))),
    };

    Ok(round6(signed))
}

fn reconstruct_timestamp(ddmmyy: &str, hhmmss: &str) -> Result<DateTime<Utc>, CodecError> {
    if ddmmyy.len() != 6 || hhmmss.len() != 6 {
        return Err(CodecError::Length("expected DDMMYY and HHMMSS to each be 6 digits".to_string()));
    }

    let digit_pair = |s: &str, at: usize| -> Result<u8, CodecError> {
        let hi = s.as_bytes()[at].checked_sub(b'0').filter(|d| *d <= 9);
        let lo = s.as_bytes()[at + 1].checked_sub(b'0').filter(|d| *d <= 9);
        match (hi, lo) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(CodecError::Length(format!("non-digit in timestamp field: {s}"))),
        }
    };

    // Reuse the BCD century rule by packing the ASCII digit pairs as if they
    // were BCD nibbles, then decoding with the shared helper.
    let dd = digit_pair(ddmmyy, 0)?;
    let mm = digit_pair(ddmmyy, 2)?;
    let yy = digit_pair(ddmmyy, 4)?;
    let hh = digit_pair(hhmmss, 0)?;
    let min = digit_pair(hhmmss, 2)?;
    let ss = digit_pair(hhmmss, 4)?;

    bcd::bcd_datetime([yy, mm, dd, hh, min, ss])
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).round() / 1_000_000.0
}

/// Maps a legacy ASCII command tag to an alarm-type label, if the tag is one
/// of this firmware family's known alarm codes.
///
/// Ordinary location-update tags (`V1`, `LK`, `UD`, …) return `None`. This
/// table is a documented convention for the HQ-family firmware this parser
/// targets, not a field defined on the wire — see design notes on the
/// ASCII alarm-type table's scope.
#[must_use]
pub fn alarm_label(command: &str) -> Option<&'static str> {
    match command.to_ascii_uppercase().as_str() {
        "SOS" | "HELP" => Some("sos"),
        "LOWBAT" | "LOWPOWER" => Some("low_battery"),
        "VIB" | "SHOCK" => Some("vibration"),
        "MOVE" | "TOW" => Some("movement"),
        "FENCE" | "GEO" => Some("geo_fence"),
        _ => None,
    }
}
