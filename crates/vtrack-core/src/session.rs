//! Session dispatcher: the per-connection state machine that turns a byte
//! stream into responses and sink events.
//!
//! Uses the action-return pattern: [`Session::push_bytes`] and
//! [`Session::tick`] take time and bytes as input and return a list of
//! [`SessionAction`]s for the connection task to execute. The dispatcher
//! itself never touches a socket.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use vtrack_proto::{
    ascii, checksum, escape,
    header::Header,
    location::LocationReport,
    response, AsciiReframer, BinaryReframer, CodecError,
};

use crate::event::{AlarmEvent, Event, LocationEvent, ParseErrorEvent, UnhandledMessageEvent};

const MSG_REGISTER: u16 = 0x0100;
const MSG_AUTHENTICATE: u16 = 0x0102;
const MSG_HEARTBEAT: u16 = 0x0002;
const MSG_LOCATION: u16 = 0x0200;

/// Idle timeout applied when no explicit override is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Which framing/body variant a connection has committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    /// Not yet observed; sniffing the first non-whitespace byte.
    Unknown,
    /// 0x7E-delimited binary frames.
    Binary,
    /// `*...#`-delimited legacy ASCII lines.
    Ascii,
}

/// Actions a session asks the connection task to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Write these already-sealed bytes to the socket.
    SendBytes(Vec<u8>),
    /// Hand this event to the sink.
    Emit(Event),
    /// Close the connection for the given reason (e.g. idle timeout).
    Close {
        /// Human-readable reason, for logging.
        reason: String,
    },
}

/// Per-session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Authentication token echoed in registration/authentication responses.
    pub register_token: String,
    /// Speed-unit convention for the ASCII path.
    pub ascii_speed_unit: ascii::SpeedUnit,
    /// Idle timeout before the connection is closed.
    pub idle_timeout: Duration,
    /// Whether parse-error events should carry a hex dump of the offending
    /// frame.
    pub log_hex: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            register_token: "OK".to_string(),
            ascii_speed_unit: ascii::SpeedUnit::Knots,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            log_hex: false,
        }
    }
}

/// A single connection's dispatch state: reframing accumulators, the
/// outbound sequence counter, and the committed protocol variant.
///
/// Generic over `Instant` so the idle timeout can be driven by a fake clock
/// in tests.
#[derive(Debug)]
pub struct Session<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: SessionConfig,
    variant: Variant,
    binary: BinaryReframer,
    ascii: AsciiReframer,
    outbound_sequence: u16,
    last_activity: I,
}

impl<I> Session<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Creates a fresh session with no variant committed yet.
    pub fn new(now: I, config: SessionConfig) -> Self {
        Self {
            config,
            variant: Variant::Unknown,
            binary: BinaryReframer::new(),
            ascii: AsciiReframer::new(),
            outbound_sequence: 0,
            last_activity: now,
        }
    }

    /// Feeds newly-read bytes into the session and returns the actions the
    /// caller must execute, in wire order.
    pub fn push_bytes(&mut self, chunk: &[u8], now: I) -> Vec<SessionAction> {
        self.last_activity = now;

        if self.variant == Variant::Unknown {
            let Some(&first) = chunk.iter().find(|b| !b.is_ascii_whitespace()) else {
                return Vec::new();
            };
            self.variant = if first == b'*' { Variant::Ascii } else { Variant::Binary };
        }

        match self.variant {
            Variant::Binary => {
                let frames = self.binary.push(chunk);
                frames.iter().flat_map(|frame| self.dispatch_binary(frame)).collect()
            },
            Variant::Ascii => {
                let frames = self.ascii.push(chunk);
                frames.iter().flat_map(|frame| self.dispatch_ascii(frame)).collect()
            },
            Variant::Unknown => unreachable!("variant committed above"),
        }
    }

    /// Periodic maintenance: closes the connection once it has been idle
    /// longer than the configured timeout.
    pub fn tick(&self, now: I) -> Vec<SessionAction> {
        let elapsed = now - self.last_activity;
        if elapsed > self.config.idle_timeout {
            return vec![SessionAction::Close {
                reason: format!("idle timeout after {elapsed:?}"),
            }];
        }
        Vec::new()
    }

    fn next_sequence(&mut self) -> u16 {
        self.outbound_sequence = self.outbound_sequence.wrapping_add(1);
        if self.outbound_sequence == 0 {
            self.outbound_sequence = 1;
        }
        self.outbound_sequence
    }

    fn dispatch_binary(&mut self, frame: &[u8]) -> Vec<SessionAction> {
        if self.config.log_hex {
            tracing::trace!(frame = %vtrack_proto::hexdump::hex_dump(frame), "binary frame received");
        }
        match self.decode_binary(frame) {
            Ok((header, body)) => self.dispatch_decoded(&header, body),
            Err(err) => {
                tracing::debug!(%err, "binary frame decode failed");
                vec![SessionAction::Emit(Event::ParseError(self.parse_error_event(&err, None, frame)))]
            },
        }
    }

    fn decode_binary(&self, frame: &[u8]) -> Result<(Header, Vec<u8>), CodecError> {
        let unescaped = escape::unescape(frame)?;
        if unescaped.is_empty() {
            return Err(CodecError::Length("empty frame interior".to_string()));
        }
        let (payload, checksum_byte) = unescaped.split_at(unescaped.len() - 1);
        let computed = checksum::xor_checksum(payload);
        if computed != checksum_byte[0] {
            return Err(CodecError::Checksum { computed, claimed: checksum_byte[0] });
        }
        let (header, body) = Header::decode(payload)?;
        Ok((header, body.to_vec()))
    }

    fn dispatch_decoded(&mut self, header: &Header, body: Vec<u8>) -> Vec<SessionAction> {
        match header.message_id {
            MSG_REGISTER | MSG_AUTHENTICATE => {
                let seq = self.next_sequence();
                let ack = response::build_registration_response(
                    &header.terminal_id,
                    seq,
                    header.sequence,
                    0,
                    &self.config.register_token,
                );
                vec![SessionAction::SendBytes(ack)]
            },
            MSG_HEARTBEAT => {
                let seq = self.next_sequence();
                let ack = response::build_general_response(
                    &header.terminal_id,
                    seq,
                    header.sequence,
                    header.message_id,
                    0,
                );
                vec![SessionAction::SendBytes(ack)]
            },
            MSG_LOCATION => {
                let mut actions = Vec::new();
                match LocationReport::decode(&body) {
                    Ok((report, tlv_errors)) => {
                        actions.push(SessionAction::Emit(Event::LocationEvent(LocationEvent {
                            terminal_id: header.terminal_id.clone(),
                            timestamp: report.timestamp,
                            latitude: report.latitude,
                            longitude: report.longitude,
                            altitude_m: Some(report.altitude_m),
                            speed_kmh: report.speed_kmh,
                            heading: report.heading.to_string(),
                            alarm: Some(report.alarm),
                            status: Some(report.status),
                            extras: report.extras,
                        })));
                        for err in tlv_errors {
                            actions.push(SessionAction::Emit(Event::ParseError(self.parse_error_event(
                                &err,
                                Some(header.terminal_id.clone()),
                                &body,
                            ))));
                        }
                    },
                    Err(err) => {
                        actions.push(SessionAction::Emit(Event::ParseError(self.parse_error_event(
                            &err,
                            Some(header.terminal_id.clone()),
                            &body,
                        ))));
                        return actions;
                    },
                }
                let seq = self.next_sequence();
                let ack = response::build_general_response(
                    &header.terminal_id,
                    seq,
                    header.sequence,
                    header.message_id,
                    0,
                );
                actions.push(SessionAction::SendBytes(ack));
                actions
            },
            other => vec![SessionAction::Emit(Event::UnhandledMessage(UnhandledMessageEvent {
                terminal_id: header.terminal_id.clone(),
                message_id: other,
                body_hex: vtrack_proto::hexdump::hex_dump(&body),
            }))],
        }
    }

    fn dispatch_ascii(&self, frame: &[u8]) -> Vec<SessionAction> {
        match ascii::parse(frame, self.config.ascii_speed_unit) {
            Ok(record) => {
                if let Some(alarm_type) = ascii::alarm_label(&record.command) {
                    vec![SessionAction::Emit(Event::AlarmEvent(AlarmEvent {
                        terminal_id: record.terminal_id,
                        timestamp: record.timestamp,
                        latitude: record.latitude,
                        longitude: record.longitude,
                        speed_kmh: record.speed_kmh,
                        heading: record.heading,
                        alarm_type,
                    }))]
                } else {
                    vec![SessionAction::Emit(Event::LocationEvent(LocationEvent {
                        terminal_id: record.terminal_id,
                        timestamp: record.timestamp,
                        latitude: record.latitude,
                        longitude: record.longitude,
                        altitude_m: None,
                        speed_kmh: record.speed_kmh,
                        heading: record.heading,
                        alarm: None,
                        status: None,
                        extras: std::collections::BTreeMap::new(),
                    }))]
                }
            },
            Err(err) => {
                tracing::debug!(%err, "ascii frame decode failed");
                vec![SessionAction::Emit(Event::ParseError(self.parse_error_event(&err, None, frame)))]
            },
        }
    }

    fn parse_error_event(
        &self,
        err: &CodecError,
        terminal_id: Option<String>,
        frame: &[u8],
    ) -> ParseErrorEvent {
        let kind = match err {
            CodecError::Framing(_) => "framing",
            CodecError::Checksum { .. } => "checksum",
            CodecError::Length(_) => "length",
            CodecError::Tlv { .. } => "tlv",
        };
        ParseErrorEvent {
            kind,
            detail: err.to_string(),
            terminal_id,
            frame_hex: self.config.log_hex.then(|| vtrack_proto::hexdump::hex_dump(frame)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn build_frame(message_id: u16, terminal_id: &str, sequence: u16, body: &[u8]) -> Vec<u8> {
        let mut interior = Header::encode_outbound(message_id, terminal_id, sequence, body.len() as u16);
        interior.extend_from_slice(body);
        interior.push(checksum::xor_checksum(&interior));
        let escaped = escape::escape(&interior);
        let mut frame = Vec::with_capacity(escaped.len() + 2);
        frame.push(0x7E);
        frame.extend_from_slice(&escaped);
        frame.push(0x7E);
        frame
    }

    #[test]
    fn heartbeat_produces_single_ack() {
        let mut session = Session::new(Instant::now(), SessionConfig::default());
        let frame = build_frame(MSG_HEARTBEAT, "123456789010", 1, &[]);
        let actions = session.push_bytes(&frame, Instant::now());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SessionAction::SendBytes(_)));
    }

    #[test]
    fn registration_echoes_configured_token() {
        let mut session = Session::new(
            Instant::now(),
            SessionConfig { register_token: "TOK".to_string(), ..SessionConfig::default() },
        );
        let frame = build_frame(MSG_REGISTER, "123456789010", 1, &[0xAA]);
        let actions = session.push_bytes(&frame, Instant::now());
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            SessionAction::SendBytes(bytes) => {
                assert!(bytes.windows(3).any(|w| w == b"TOK"));
            },
            _ => panic!("expected SendBytes"),
        }
    }

    #[test]
    fn location_emits_event_then_ack() {
        let mut session = Session::new(Instant::now(), SessionConfig::default());
        let mut body = Vec::new();
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&3u32.to_be_bytes());
        body.extend_from_slice(&0x01dc_d650u32.to_be_bytes());
        body.extend_from_slice(&0x07a8_b078u32.to_be_bytes());
        body.extend_from_slice(&0x0064u16.to_be_bytes());
        body.extend_from_slice(&0x00c8u16.to_be_bytes());
        body.extend_from_slice(&0x005au16.to_be_bytes());
        body.extend_from_slice(&[0x24, 0x03, 0x15, 0x12, 0x30, 0x45]);

        let frame = build_frame(MSG_LOCATION, "123456789010", 5, &body);
        let actions = session.push_bytes(&frame, Instant::now());
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], SessionAction::Emit(Event::LocationEvent(_))));
        assert!(matches!(actions[1], SessionAction::SendBytes(_)));
    }

    #[test]
    fn unknown_message_id_has_no_response() {
        let mut session = Session::new(Instant::now(), SessionConfig::default());
        let frame = build_frame(0x9999, "123456789010", 1, &[]);
        let actions = session.push_bytes(&frame, Instant::now());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SessionAction::Emit(Event::UnhandledMessage(_))));
    }

    #[test]
    fn corrupt_checksum_emits_parse_error_only() {
        let mut session = Session::new(Instant::now(), SessionConfig::default());
        let mut frame = build_frame(MSG_HEARTBEAT, "123456789010", 1, &[]);
        let last = frame.len() - 2;
        frame[last] ^= 0xFF;
        let actions = session.push_bytes(&frame, Instant::now());
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            SessionAction::Emit(Event::ParseError(e)) => assert_eq!(e.kind, "checksum"),
            _ => panic!("expected ParseError"),
        }
    }

    #[test]
    fn ascii_frame_emits_location_event() {
        let mut session = Session::new(Instant::now(), SessionConfig::default());
        let frame = b"*HQ,1234567890,V1,123045,A,3215.4545,N,03451.2323,E,10.0,90,150324,FFFFFFFF#";
        let actions = session.push_bytes(frame, Instant::now());
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SessionAction::Emit(Event::LocationEvent(_))));
    }

    #[test]
    fn ascii_frame_with_alarm_command_emits_alarm_event() {
        let mut session = Session::new(Instant::now(), SessionConfig::default());
        let frame = b"*HQ,1234567890,SOS,123045,A,3215.4545,N,03451.2323,E,10.0,90,150324,FFFFFFFF#";
        let actions = session.push_bytes(frame, Instant::now());
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            SessionAction::Emit(Event::AlarmEvent(e)) => assert_eq!(e.alarm_type, "sos"),
            _ => panic!("expected AlarmEvent"),
        }
    }

    #[test]
    fn idle_timeout_closes_connection() {
        let t0 = Instant::now();
        let session = Session::new(
            t0,
            SessionConfig { idle_timeout: Duration::from_secs(1), ..SessionConfig::default() },
        );
        let actions = session.tick(t0 + Duration::from_secs(2));
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], SessionAction::Close { .. }));
    }

    #[test]
    fn sequence_counter_skips_zero_across_wrap() {
        let mut session = Session::new(Instant::now(), SessionConfig::default());
        session.outbound_sequence = u16::MAX;
        assert_eq!(session.next_sequence(), 1);
    }
}
