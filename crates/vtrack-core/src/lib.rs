//! Session dispatch for the vehicle tracking protocol.
//!
//! Owns the per-connection state machine ([`session::Session`]) that turns
//! a byte stream into outbound response bytes and sink events, plus the
//! error and event types that cross that boundary. Holds no socket and no
//! global state — every piece of mutable state here belongs to exactly one
//! connection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod session;

pub use error::DispatchError;
pub use event::Event;
pub use session::{Session, SessionAction, SessionConfig};
