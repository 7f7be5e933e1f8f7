//! Per-connection task: reads bytes off the socket, feeds them to a
//! [`Session`], and executes the actions it returns.

use std::{sync::Arc, time::Instant};

use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use vtrack_core::{event::Event, Session, SessionAction, SessionConfig};

use crate::sink::EventSink;

const READ_BUFFER_SIZE: usize = 4096;

/// Drives a single accepted TCP connection to completion: reads, dispatches
/// through a [`Session`], writes responses, and forwards events to `sink`.
pub async fn handle(mut stream: TcpStream, peer: std::net::SocketAddr, sink: Arc<dyn EventSink>, config: SessionConfig) {
    let idle_timeout = config.idle_timeout;
    let mut session = Session::new(Instant::now(), config);
    let mut buf = BytesMut::zeroed(READ_BUFFER_SIZE);

    tracing::info!(%peer, "connection accepted");

    loop {
        let read = match timeout(idle_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                tracing::info!(%peer, "connection closed by peer");
                break;
            },
            Ok(Ok(n)) => n,
            Ok(Err(err)) => {
                tracing::warn!(%peer, %err, "read error");
                break;
            },
            Err(_) => {
                tracing::info!(%peer, "idle timeout");
                break;
            },
        };

        let actions = session.push_bytes(&buf[..read], Instant::now());
        if !execute(&mut stream, &sink, actions, peer).await {
            break;
        }
    }

    tracing::info!(%peer, "connection closed");
}

/// Executes one batch of [`SessionAction`]s against the socket and sink.
/// Returns `false` if the connection should be closed.
async fn execute(
    stream: &mut TcpStream,
    sink: &Arc<dyn EventSink>,
    actions: Vec<SessionAction>,
    peer: std::net::SocketAddr,
) -> bool {
    for action in actions {
        match action {
            SessionAction::SendBytes(bytes) => {
                if let Err(err) = stream.write_all(&bytes).await {
                    tracing::warn!(%peer, %err, "write error");
                    return false;
                }
            },
            SessionAction::Emit(event) => {
                match &event {
                    Event::ParseError(e) => tracing::warn!(%peer, kind = e.kind, detail = %e.detail, "parse error"),
                    Event::UnhandledMessage(e) => {
                        tracing::info!(%peer, message_id = format!("{:#06x}", e.message_id), "unhandled message");
                    },
                    Event::LocationEvent(_) | Event::AlarmEvent(_) => {},
                }
                if let Err(err) = sink.accept(&event) {
                    tracing::warn!(%peer, %err, "sink rejected event");
                }
            },
            SessionAction::Close { reason } => {
                tracing::info!(%peer, %reason, "closing connection");
                return false;
            },
        }
    }
    true
}
