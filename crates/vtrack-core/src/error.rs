//! Error types for the session dispatcher.
//!
//! Wraps the wire-level [`vtrack_proto::CodecError`] taxonomy and adds the
//! one failure mode that only exists once a sink is in the picture.

use thiserror::Error;
use vtrack_proto::CodecError;

/// Errors a session can encounter while dispatching decoded frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A wire-level codec failure (framing, checksum, length, or TLV).
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The event sink rejected or failed to accept an emitted event.
    #[error("sink error: {0}")]
    Sink(String),
}
