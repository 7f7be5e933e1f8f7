//! Server error types.

use thiserror::Error;
use vtrack_core::DispatchError;

/// Errors that can occur in the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Listener failed to bind; fatal, the process exits non-zero.
    #[error("bind error: {0}")]
    Bind(String),

    /// Socket I/O failure on an accepted connection.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The session dispatcher reported a `SinkError`, i.e. the event sink
    /// rejected an event. Logged; does not terminate the connection.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
