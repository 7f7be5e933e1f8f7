//! TCP ingestion server for the vehicle tracking protocol.
//!
//! Wraps [`vtrack_core`]'s sans-IO session dispatcher with a plain Tokio TCP
//! accept loop: one task per connection, no shared mutable state besides
//! the event sink.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
pub mod sink;

use std::{net::SocketAddr, sync::Arc, time::Duration};

pub use error::ServerError;
use sink::{build_sink, PrintMode};
use tokio::net::TcpListener;
use vtrack_core::SessionConfig;
use vtrack_proto::SpeedUnit;

/// Runtime configuration for the ingestion server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub listen_port: u16,
    /// How decoded events are rendered.
    pub print_mode: PrintMode,
    /// Whether parse-error events carry a hex dump of the offending frame.
    pub log_hex: bool,
    /// Authentication token echoed in registration/authentication
    /// responses.
    pub register_token: String,
    /// Speed-unit convention for the ASCII path.
    pub ascii_speed_unit: SpeedUnit,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: 6808,
            print_mode: PrintMode::Line,
            log_hex: false,
            register_token: "OK".to_string(),
            ascii_speed_unit: SpeedUnit::Knots,
            idle_timeout: vtrack_core::session::DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl From<&ServerConfig> for SessionConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            register_token: config.register_token.clone(),
            ascii_speed_unit: config.ascii_speed_unit,
            idle_timeout: config.idle_timeout,
            log_hex: config.log_hex,
        }
    }
}

/// The ingestion server: a bound listener plus the configuration every
/// accepted connection inherits.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    /// Binds a listener on `config.listen_port` across all interfaces.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
        let listener =
            TcpListener::bind(addr).await.map_err(|err| ServerError::Bind(err.to_string()))?;
        Ok(Self { listener, config })
    }

    /// Local address the server is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the OS cannot report the local
    /// address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, spawning one task per connection. Each
    /// task owns its own [`vtrack_core::Session`] and writes decoded events
    /// to a shared sink built from `config.print_mode`.
    ///
    /// Returns only on a fatal accept error; a healthy server runs until
    /// the process receives a termination signal.
    pub async fn run(self) -> Result<(), ServerError> {
        let sink: Arc<dyn sink::EventSink> = Arc::from(build_sink(self.config.print_mode));
        tracing::info!(port = self.config.listen_port, "listening");

        loop {
            let (stream, peer) = self.listener.accept().await?;
            let sink = Arc::clone(&sink);
            let session_config = SessionConfig::from(&self.config);

            tokio::spawn(async move {
                connection::handle(stream, peer, sink, session_config).await;
            });
        }
    }
}
