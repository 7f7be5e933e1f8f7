//! Event sink: the capability that accepts decoded events, parse errors,
//! and unhandled-message notices from every connection task.
//!
//! The core dispatcher knows nothing about stdout, JSON, or tables — it
//! only knows [`vtrack_core::Event`]. This module is where that gets
//! turned into something an operator can watch.
#![allow(clippy::print_stdout)]

use std::io::Write;

use vtrack_core::{
    error::DispatchError,
    event::{AlarmEvent, Event, LocationEvent, ParseErrorEvent, UnhandledMessageEvent},
};

/// How an [`EventSink`] renders events for human consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PrintMode {
    /// One short human-readable line per event.
    Line,
    /// One JSON object per event (newline-delimited).
    Json,
    /// A fixed-width tabular row per event.
    Table,
}

/// Accepts events from many connection tasks concurrently.
///
/// Implementations must be safe to call from multiple tasks at once; the
/// core makes no ordering promise across connections, only within one. A
/// sink that cannot accept an event (a downstream collaborator rejecting a
/// write, say) returns [`DispatchError::Sink`] rather than panicking; the
/// caller logs it and keeps the connection open.
pub trait EventSink: Send + Sync {
    /// A decoded location fix.
    fn location_event(&self, event: &LocationEvent) -> Result<(), DispatchError>;
    /// An alarm signalled by the legacy ASCII path's command tag.
    fn alarm_event(&self, event: &AlarmEvent) -> Result<(), DispatchError>;
    /// A decode failure confined to the originating connection.
    fn parse_error(&self, event: &ParseErrorEvent) -> Result<(), DispatchError>;
    /// A well-formed frame with no dispatch rule for its message id.
    fn unhandled_message(&self, event: &UnhandledMessageEvent) -> Result<(), DispatchError>;
}

impl dyn EventSink {
    /// Dispatches a single [`Event`] to the matching sink method.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Sink`] if the sink rejected the event.
    pub fn accept(&self, event: &Event) -> Result<(), DispatchError> {
        match event {
            Event::LocationEvent(e) => self.location_event(e),
            Event::AlarmEvent(e) => self.alarm_event(e),
            Event::ParseError(e) => self.parse_error(e),
            Event::UnhandledMessage(e) => self.unhandled_message(e),
        }
    }
}

/// Prints one short line per event to stdout.
#[derive(Debug, Default)]
pub struct LineSink;

impl EventSink for LineSink {
    fn location_event(&self, event: &LocationEvent) -> Result<(), DispatchError> {
        println!(
            "location terminal={} lat={:.6} lon={:.6} speed_kmh={:.1} ts={}",
            event.terminal_id, event.latitude, event.longitude, event.speed_kmh, event.timestamp
        );
        Ok(())
    }

    fn alarm_event(&self, event: &AlarmEvent) -> Result<(), DispatchError> {
        println!(
            "alarm type={} terminal={} lat={:.6} lon={:.6} ts={}",
            event.alarm_type, event.terminal_id, event.latitude, event.longitude, event.timestamp
        );
        Ok(())
    }

    fn parse_error(&self, event: &ParseErrorEvent) -> Result<(), DispatchError> {
        println!(
            "parse_error kind={} terminal={} detail={}",
            event.kind,
            event.terminal_id.as_deref().unwrap_or("-"),
            event.detail
        );
        Ok(())
    }

    fn unhandled_message(&self, event: &UnhandledMessageEvent) -> Result<(), DispatchError> {
        println!(
            "unhandled terminal={} message_id={:#06x} body={}",
            event.terminal_id, event.message_id, event.body_hex
        );
        Ok(())
    }
}

/// Prints one newline-delimited JSON object per event to stdout.
#[derive(Debug, Default)]
pub struct JsonSink;

impl EventSink for JsonSink {
    fn location_event(&self, event: &LocationEvent) -> Result<(), DispatchError> {
        print_json(event)
    }

    fn alarm_event(&self, event: &AlarmEvent) -> Result<(), DispatchError> {
        print_json(event)
    }

    fn parse_error(&self, event: &ParseErrorEvent) -> Result<(), DispatchError> {
        print_json(event)
    }

    fn unhandled_message(&self, event: &UnhandledMessageEvent) -> Result<(), DispatchError> {
        print_json(event)
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), DispatchError> {
    let line = serde_json::to_string(value)
        .map_err(|err| DispatchError::Sink(format!("failed to serialize event: {err}")))?;
    println!("{line}");
    Ok(())
}

/// Prints a fixed-width tabular row per event to stdout.
#[derive(Debug, Default)]
pub struct TableSink;

impl EventSink for TableSink {
    fn location_event(&self, event: &LocationEvent) -> Result<(), DispatchError> {
        println!(
            "{:<12} {:<10} {:>10.6} {:>11.6} {:>7.1} {}",
            event.terminal_id, "location", event.latitude, event.longitude, event.speed_kmh, event.timestamp
        );
        Ok(())
    }

    fn alarm_event(&self, event: &AlarmEvent) -> Result<(), DispatchError> {
        println!(
            "{:<12} {:<10} {:>10.6} {:>11.6} {}",
            event.terminal_id, event.alarm_type, event.latitude, event.longitude, event.timestamp
        );
        Ok(())
    }

    fn parse_error(&self, event: &ParseErrorEvent) -> Result<(), DispatchError> {
        println!(
            "{:<12} {:<10} {:<10} {}",
            event.terminal_id.as_deref().unwrap_or("-"),
            "parse_error",
            event.kind,
            event.detail
        );
        Ok(())
    }

    fn unhandled_message(&self, event: &UnhandledMessageEvent) -> Result<(), DispatchError> {
        println!(
            "{:<12} {:<10} {:#06x}        {}",
            event.terminal_id, "unhandled", event.message_id, event.body_hex
        );
        Ok(())
    }
}

/// Builds the sink matching the configured [`PrintMode`], flushing stdout
/// after construction so output isn't buffered away on an early crash.
#[must_use]
pub fn build_sink(mode: PrintMode) -> Box<dyn EventSink> {
    let _ = std::io::stdout().flush();
    match mode {
        PrintMode::Line => Box::new(LineSink),
        PrintMode::Json => Box::new(JsonSink),
        PrintMode::Table => Box::new(TableSink),
    }
}
