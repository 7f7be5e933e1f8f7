//! Events a session emits to the sink.
//!
//! These are what the sink actually sees: owned, serializable records, one
//! variant per kind the dispatcher can produce. No references into the
//! connection's accumulator survive past emission.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vtrack_proto::TlvValue;

/// A decoded location report, from either the binary or ASCII path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationEvent {
    /// Terminal id the report came from.
    pub terminal_id: String,
    /// UTC timestamp of the fix.
    pub timestamp: DateTime<Utc>,
    /// Latitude in signed decimal degrees.
    pub latitude: f64,
    /// Longitude in signed decimal degrees.
    pub longitude: f64,
    /// Altitude in metres; `None` on the ASCII path, which carries no
    /// altitude field.
    pub altitude_m: Option<i32>,
    /// Speed in km/h, one fractional digit.
    pub speed_kmh: f64,
    /// Heading, rendered as the wire carries it (binary: integer degrees
    /// rendered as a string; ASCII: the raw course field).
    pub heading: String,
    /// 32-bit alarm bitfield; `None` on the ASCII path.
    pub alarm: Option<u32>,
    /// 32-bit status bitfield; `None` on the ASCII path.
    pub status: Option<u32>,
    /// Recognised and unrecognised TLV extras, keyed by tag; empty on the
    /// ASCII path (it carries no TLV tail).
    pub extras: BTreeMap<u8, TlvValue>,
}

/// An alarm signalled by the legacy ASCII path's command tag (e.g. `SOS`,
/// `LOWBAT`). Same shape as [`LocationEvent`] plus the recognised label; the
/// binary path instead rides its alarm bitfield on a normal location event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmEvent {
    /// Terminal id the alarm came from.
    pub terminal_id: String,
    /// UTC timestamp of the fix accompanying the alarm.
    pub timestamp: DateTime<Utc>,
    /// Latitude in signed decimal degrees.
    pub latitude: f64,
    /// Longitude in signed decimal degrees.
    pub longitude: f64,
    /// Speed in km/h at the time of the alarm.
    pub speed_kmh: f64,
    /// Heading, carried through verbatim as the wire sends it.
    pub heading: String,
    /// Recognised alarm-type label (e.g. `"sos"`, `"geo_fence"`).
    pub alarm_type: &'static str,
}

/// A structured record of a decode failure: framing, checksum, length, or
/// TLV overrun. Never tears down the connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseErrorEvent {
    /// Which error kind occurred, as a short label ("framing", "checksum",
    /// "length", "tlv").
    pub kind: &'static str,
    /// Human-readable detail from the underlying codec error.
    pub detail: String,
    /// Terminal id, if it was recoverable before the error occurred.
    pub terminal_id: Option<String>,
    /// Hex dump of the offending frame, present only when hex tracing is
    /// enabled.
    pub frame_hex: Option<String>,
}

/// A valid frame whose message id has no dispatch rule. Informational, not
/// a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnhandledMessageEvent {
    /// Terminal id the frame came from.
    pub terminal_id: String,
    /// The message id that had no dispatch rule.
    pub message_id: u16,
    /// Hex dump of the body.
    pub body_hex: String,
}

/// Everything a session can hand to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A decoded location fix.
    LocationEvent(LocationEvent),
    /// An alarm signalled by the legacy ASCII path's command tag.
    AlarmEvent(AlarmEvent),
    /// A decode failure, confined to the originating connection.
    ParseError(ParseErrorEvent),
    /// A well-formed frame with no dispatch rule for its message id.
    UnhandledMessage(UnhandledMessageEvent),
}
