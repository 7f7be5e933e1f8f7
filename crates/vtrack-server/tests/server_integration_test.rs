//! End-to-end test of the real TCP listener: binds an ephemeral port, drives
//! a heartbeat over an actual socket, and checks the acknowledgement bytes
//! come back framed and checksummed correctly.

use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use vtrack_proto::{checksum, escape, header::Header, SpeedUnit};
use vtrack_server::{sink::PrintMode, Server, ServerConfig};

fn heartbeat_frame(terminal_id: &str, sequence: u16) -> Vec<u8> {
    let mut interior = Header::encode_outbound(0x0002, terminal_id, sequence, 0);
    interior.push(checksum::xor_checksum(&interior));
    let escaped = escape::escape(&interior);
    let mut frame = Vec::with_capacity(escaped.len() + 2);
    frame.push(0x7E);
    frame.extend_from_slice(&escaped);
    frame.push(0x7E);
    frame
}

async fn spawn_test_server() -> std::net::SocketAddr {
    let config = ServerConfig {
        listen_port: 0,
        print_mode: PrintMode::Line,
        log_hex: false,
        register_token: "OK".to_string(),
        ascii_speed_unit: SpeedUnit::Knots,
        idle_timeout: Duration::from_secs(5),
    };
    let server = Server::bind(config).await.expect("bind ephemeral port");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

#[tokio::test]
async fn heartbeat_roundtrip_over_real_socket() {
    let addr = spawn_test_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");

    let frame = heartbeat_frame("123456789010", 1);
    stream.write_all(&frame).await.expect("write heartbeat");

    let mut buf = [0u8; 256];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("ack did not arrive in time")
        .expect("read ack");

    let ack = &buf[..n];
    assert_eq!(ack.first(), Some(&0x7E));
    assert_eq!(ack.last(), Some(&0x7E));

    let interior = escape::unescape(&ack[1..ack.len() - 1]).expect("valid escape sequence");
    let (payload, checksum_byte) = interior.split_at(interior.len() - 1);
    assert_eq!(checksum::xor_checksum(payload), checksum_byte[0]);

    let (header, body) = Header::decode(payload).expect("valid header");
    assert_eq!(header.message_id, 0x8001);
    assert_eq!(body, &[0x00, 0x01, 0x00, 0x02, 0x00]);
}

#[tokio::test]
async fn corrupt_frame_gets_no_response() {
    let addr = spawn_test_server().await;
    let mut stream = TcpStream::connect(addr).await.expect("connect");

    let mut frame = heartbeat_frame("123456789010", 1);
    let last = frame.len() - 2;
    frame[last] ^= 0xFF; // flip the checksum byte

    stream.write_all(&frame).await.expect("write corrupt frame");

    // Send a second, well-formed heartbeat so the connection is proven alive
    // and we can observe exactly one ack, not a response to the corrupt one.
    let good = heartbeat_frame("123456789010", 2);
    stream.write_all(&good).await.expect("write second heartbeat");

    let mut buf = [0u8; 256];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .expect("ack did not arrive in time")
        .expect("read ack");

    let ack = &buf[..n];
    let interior = escape::unescape(&ack[1..ack.len() - 1]).expect("valid escape sequence");
    let (payload, _) = interior.split_at(interior.len() - 1);
    let (_header, body) = Header::decode(payload).expect("valid header");
    // Only the second (sequence 2) heartbeat should have been acknowledged.
    assert_eq!(body, &[0x00, 0x02, 0x00, 0x02, 0x00]);
}
