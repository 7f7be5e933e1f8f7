//! Location report (message id 0x0200) body decoding: the 28-byte mandatory
//! prefix plus the optional TLV tail.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{bcd, error::CodecError, hexdump};

const PREFIX_LEN: usize = 28;

const TLV_ODOMETER: u8 = 0x01;
const TLV_GSM_SIGNAL: u8 = 0x30;
const TLV_GNSS_SIGNAL: u8 = 0x31;
const TLV_HDOP: u8 = 0x32;
const TLV_SATELLITES: u8 = 0x33;
const TLV_IGNITION: u8 = 0x34;
const TLV_IO_WORD: u8 = 0x57;
const TLV_VOLTAGE: u8 = 0x82;

/// A single recognised TLV value, already converted to display units.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum TlvValue {
    /// Odometer reading in kilometres.
    OdometerKm(f64),
    /// GSM signal strength, raw integer.
    GsmSignal(u8),
    /// GNSS signal strength, raw integer.
    GnssSignal(u8),
    /// Horizontal dilution of precision.
    Hdop(u8),
    /// Satellites currently in use.
    Satellites(u8),
    /// Ignition state.
    Ignition(bool),
    /// Opaque I/O status word, rendered as hex.
    IoWord(String),
    /// External supply voltage in volts.
    VoltageVolts(f64),
    /// Any tag without a known decoding, preserved as hex.
    Unknown(String),
}

/// A fully decoded 0x0200 location report.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    /// 32-bit alarm bitfield, raw.
    pub alarm: u32,
    /// 32-bit status bitfield, raw.
    pub status: u32,
    /// Latitude magnitude in decimal degrees (sign lives in `status`; see
    /// design notes on the binary variant's sign ambiguity).
    pub latitude: f64,
    /// Longitude magnitude in decimal degrees.
    pub longitude: f64,
    /// Altitude in metres.
    pub altitude_m: i32,
    /// Speed in km/h (one fractional digit).
    pub speed_kmh: f64,
    /// Heading in degrees, 0-359.
    pub heading: u16,
    /// UTC timestamp from the BCD field.
    pub timestamp: DateTime<Utc>,
    /// Recognised and unrecognised TLV extras, keyed by tag.
    pub extras: BTreeMap<u8, TlvValue>,
}

impl LocationReport {
    /// Decodes the 28-byte mandatory prefix and any trailing TLVs.
    ///
    /// A TLV whose declared length overruns the remaining bytes stops TLV
    /// parsing and is reported via the returned `Vec<CodecError>`, but does
    /// not fail the overall decode — the fixed prefix is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Length`] if `body` is shorter than the 28-byte
    /// mandatory prefix.
    pub fn decode(body: &[u8]) -> Result<(Self, Vec<CodecError>), CodecError> {
        if body.len() < PREFIX_LEN {
            return Err(CodecError::Length(format!(
                "location report requires at least {PREFIX_LEN} bytes, got {}",
                body.len()
            )));
        }

        let alarm = u32::from_be_bytes(body[0..4].try_into().unwrap_or_default());
        let status = u32::from_be_bytes(body[4..8].try_into().unwrap_or_default());
        let latitude = u32::from_be_bytes(body[8..12].try_into().unwrap_or_default()) as f64 / 1e6;
        let longitude =
            u32::from_be_bytes(body[12..16].try_into().unwrap_or_default()) as f64 / 1e6;
        let altitude_m = i32::from(u16::from_be_bytes(body[16..18].try_into().unwrap_or_default()));
        let speed_raw = u16::from_be_bytes(body[18..20].try_into().unwrap_or_default());
        let speed_kmh = round1(f64::from(speed_raw) / 10.0);
        let heading = u16::from_be_bytes(body[20..22].try_into().unwrap_or_default());
        let timestamp_bytes: [u8; 6] = body[22..28].try_into().unwrap_or_default();
        let timestamp = bcd::bcd_datetime(timestamp_bytes)?;

        let (extras, errors) = decode_tlvs(&body[PREFIX_LEN..]);

        Ok((
            Self {
                alarm,
                status,
                latitude: round6(latitude),
                longitude: round6(longitude),
                altitude_m,
                speed_kmh,
                heading,
                timestamp,
                extras,
            },
            errors,
        ))
    }
}

fn decode_tlvs(mut rest: &[u8]) -> (BTreeMap<u8, TlvValue>, Vec<CodecError>) {
    let mut extras = BTreeMap::new();
    let mut errors = Vec::new();

    while !rest.is_empty() {
        if rest.len() < 2 {
            break;
        }
        let tag = rest[0];
        let len = rest[1] as usize;
        let value_region = &rest[2..];

        if len > value_region.len() {
            errors.push(CodecError::Tlv { tag, declared: len, available: value_region.len() });
            break;
        }

        let value = &value_region[..len];
        extras.insert(tag, decode_tlv_value(tag, value));
        rest = &value_region[len..];
    }

    (extras, errors)
}

fn decode_tlv_value(tag: u8, value: &[u8]) -> TlvValue {
    match tag {
        TLV_ODOMETER if value.len() == 4 => {
            let raw = u32::from_be_bytes(value.try_into().unwrap_or_default());
            TlvValue::OdometerKm(round1(f64::from(raw) / 10.0))
        },
        TLV_GSM_SIGNAL if value.len() == 1 => TlvValue::GsmSignal(value[0]),
        TLV_GNSS_SIGNAL if value.len() == 1 => TlvValue::GnssSignal(value[0]),
        TLV_HDOP if value.len() == 1 => TlvValue::Hdop(value[0]),
        TLV_SATELLITES if value.len() == 1 => TlvValue::Satellites(value[0]),
        TLV_IGNITION if value.len() == 1 => TlvValue::Ignition(value[0] & 0x01 != 0),
        TLV_IO_WORD if value.len() == 8 => TlvValue::IoWord(hexdump::hex_dump(value)),
        TLV_VOLTAGE if value.len() == 2 => {
            let raw = u16::from_be_bytes(value.try_into().unwrap_or_default());
            TlvValue::VoltageVolts(round1(f64::from(raw) / 10.0))
        },
        _ => TlvValue::Unknown(hexdump::hex_dump(value)),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round6(x: f64) -> f64 {
    (x * 1_000_000.0).round() / 1_000_000.0
}
