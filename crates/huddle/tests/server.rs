//! Integration tests for the relay: full TCP connections end to end.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use huddle::HuddleServerBuilder;
use huddle_protocol::{
    CLIENT_SIGNATURE, ClientMessageKind, Frame, FrameCodec, SERVER_SIGNATURE,
    ServerMessageKind,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

// =========================================================================
// Helpers
// =========================================================================

type Client = Framed<TcpStream, FrameCodec>;

/// Starts a relay on a random port and returns its address.
async fn start_server() -> String {
    let server = HuddleServerBuilder::new()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> Client {
    let stream = TcpStream::connect(addr).await.expect("should connect");
    Framed::new(stream, FrameCodec::client())
}

async fn send(client: &mut Client, kind: ClientMessageKind, payload: &[u8]) {
    client
        .send(Frame::new(kind.to_wire(), Bytes::copy_from_slice(payload)))
        .await
        .expect("send frame");
}

/// Receives the next frame, failing the test if nothing arrives in time.
async fn recv(client: &mut Client) -> Frame {
    timeout(Duration::from_secs(1), client.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed unexpectedly")
        .expect("frame should decode")
}

/// Asserts that no frame arrives within a short window.
async fn assert_silence(client: &mut Client) {
    let result = timeout(Duration::from_millis(100), client.next()).await;
    assert!(result.is_err(), "expected silence, got {result:?}");
}

/// Asserts that the server has closed the connection (clean EOF).
async fn assert_closed(client: &mut Client) {
    let next = timeout(Duration::from_secs(1), client.next())
        .await
        .expect("timed out waiting for the connection to close");
    assert!(next.is_none(), "expected EOF, got {next:?}");
}

/// Creates a session and asserts the CreatedSession acknowledgment.
async fn create(client: &mut Client, name: &str) {
    send(client, ClientMessageKind::CreateSession, name.as_bytes()).await;
    let ack = recv(client).await;
    assert_eq!(ack.kind, ServerMessageKind::CreatedSession.to_wire());
    assert_eq!(&ack.payload[..], name.as_bytes());
}

/// Joins a session and asserts the JoinedSession acknowledgment.
async fn join(client: &mut Client, name: &str) {
    send(client, ClientMessageKind::JoinSession, name.as_bytes()).await;
    let ack = recv(client).await;
    assert_eq!(ack.kind, ServerMessageKind::JoinedSession.to_wire());
    assert_eq!(&ack.payload[..], name.as_bytes());
}

// =========================================================================
// Session lifecycle
// =========================================================================

#[tokio::test]
async fn test_create_session_is_acknowledged() {
    let addr = start_server().await;
    let mut master = connect(&addr).await;
    create(&mut master, "alpha").await;
}

#[tokio::test]
async fn test_duplicate_create_is_silently_rejected() {
    let addr = start_server().await;
    let mut first = connect(&addr).await;
    let mut second = connect(&addr).await;

    create(&mut first, "alpha").await;

    send(&mut second, ClientMessageKind::CreateSession, b"alpha").await;
    assert_silence(&mut second).await;

    // The original session is intact: the second connection can still
    // join it, and its broadcasts reach the first master.
    join(&mut second, "alpha").await;
    send(&mut second, ClientMessageKind::Broadcast, b"ping").await;
    let frame = recv(&mut first).await;
    assert_eq!(frame.kind, ServerMessageKind::BroadcastCommand.to_wire());
    assert_eq!(&frame.payload[..], b"ping");
}

#[tokio::test]
async fn test_join_unknown_session_is_a_noop() {
    let addr = start_server().await;
    let mut client = connect(&addr).await;

    send(&mut client, ClientMessageKind::JoinSession, b"missing").await;
    assert_silence(&mut client).await;

    // The rejected join created nothing and the connection still works.
    create(&mut client, "missing").await;
}

#[tokio::test]
async fn test_create_while_in_session_is_ignored() {
    let addr = start_server().await;
    let mut master = connect(&addr).await;
    create(&mut master, "alpha").await;

    send(&mut master, ClientMessageKind::CreateSession, b"beta").await;
    assert_silence(&mut master).await;

    // "beta" was never registered, so someone else can claim it.
    let mut other = connect(&addr).await;
    create(&mut other, "beta").await;
}

#[tokio::test]
async fn test_rejoin_while_in_session_is_ignored() {
    let addr = start_server().await;
    let mut master = connect(&addr).await;
    let mut joiner = connect(&addr).await;

    create(&mut master, "alpha").await;
    join(&mut joiner, "alpha").await;

    send(&mut joiner, ClientMessageKind::JoinSession, b"alpha").await;
    assert_silence(&mut joiner).await;

    // Membership stayed single: one broadcast arrives exactly once.
    send(&mut master, ClientMessageKind::Broadcast, b"once").await;
    let frame = recv(&mut joiner).await;
    assert_eq!(&frame.payload[..], b"once");
    assert_silence(&mut joiner).await;
}

// =========================================================================
// Broadcast fan-out
// =========================================================================

#[tokio::test]
async fn test_broadcast_reaches_everyone_but_the_sender() {
    let addr = start_server().await;
    let mut master = connect(&addr).await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    create(&mut master, "alpha").await;
    join(&mut a, "alpha").await;
    join(&mut b, "alpha").await;

    // Arbitrary binary payload; it must come back byte-exact.
    let payload = [0x00, 0xff, 0x12, 0x34, 0x56, 0x78, 0x98, 0x00];
    send(&mut a, ClientMessageKind::Broadcast, &payload).await;

    for recipient in [&mut master, &mut b] {
        let frame = recv(recipient).await;
        assert_eq!(frame.kind, ServerMessageKind::BroadcastCommand.to_wire());
        assert_eq!(&frame.payload[..], &payload);
    }
    assert_silence(&mut a).await;
}

#[tokio::test]
async fn test_broadcast_before_joining_is_dropped() {
    let addr = start_server().await;
    let mut client = connect(&addr).await;

    send(&mut client, ClientMessageKind::Broadcast, b"into the void").await;
    assert_silence(&mut client).await;

    // Connection is unaffected.
    create(&mut client, "alpha").await;
}

#[tokio::test]
async fn test_departed_member_no_longer_receives() {
    let addr = start_server().await;
    let mut master = connect(&addr).await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    create(&mut master, "alpha").await;
    join(&mut a, "alpha").await;
    join(&mut b, "alpha").await;

    drop(a);
    // Let the relay process the disconnect.
    tokio::time::sleep(Duration::from_millis(50)).await;

    send(&mut b, ClientMessageKind::Broadcast, b"still here").await;
    let frame = recv(&mut master).await;
    assert_eq!(&frame.payload[..], b"still here");
    assert_silence(&mut b).await;
}

// =========================================================================
// Disconnects and teardown
// =========================================================================

#[tokio::test]
async fn test_master_disconnect_tears_down_the_session() {
    let addr = start_server().await;
    let mut master = connect(&addr).await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;

    create(&mut master, "alpha").await;
    join(&mut a, "alpha").await;
    join(&mut b, "alpha").await;

    drop(master);

    // Every remaining member is forcibly closed.
    assert_closed(&mut a).await;
    assert_closed(&mut b).await;

    // The name is free again, so the session is really gone.
    let mut successor = connect(&addr).await;
    create(&mut successor, "alpha").await;
}

#[tokio::test]
async fn test_member_disconnect_leaves_the_session_intact() {
    let addr = start_server().await;
    let mut master = connect(&addr).await;
    let mut a = connect(&addr).await;

    create(&mut master, "alpha").await;
    join(&mut a, "alpha").await;
    drop(a);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Session still exists: new members can join and hear the master.
    let mut b = connect(&addr).await;
    join(&mut b, "alpha").await;
    send(&mut master, ClientMessageKind::Broadcast, b"hello b").await;
    let frame = recv(&mut b).await;
    assert_eq!(&frame.payload[..], b"hello b");
}

// =========================================================================
// Framing
// =========================================================================

#[tokio::test]
async fn test_bad_signature_closes_the_connection() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(&addr).await.expect("connect");

    // A frame with the wrong magic, followed in the same write by a
    // perfectly valid create. The valid frame must never be processed.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&SERVER_SIGNATURE.to_le_bytes());
    bytes.extend_from_slice(&0_u32.to_le_bytes());
    bytes.extend_from_slice(&0x1_u32.to_le_bytes());
    bytes.extend_from_slice(&client_frame_bytes(0x1, b"poisoned"));
    stream.write_all(&bytes).await.expect("write");

    // Server closes; no acknowledgment ever arrives.
    let mut buf = [0u8; 64];
    let n = timeout(Duration::from_secs(1), stream.read(&mut buf))
        .await
        .expect("timed out waiting for close")
        .expect("read");
    assert_eq!(n, 0, "expected EOF, got {n} bytes");

    // "poisoned" was never created.
    let mut other = connect(&addr).await;
    create(&mut other, "poisoned").await;
}

#[tokio::test]
async fn test_unknown_message_type_is_ignored() {
    let addr = start_server().await;
    let mut client = connect(&addr).await;

    client
        .send(Frame::new(0x7f, Bytes::from_static(b"whatever")))
        .await
        .expect("send");
    assert_silence(&mut client).await;

    // Still connected and fully functional.
    create(&mut client, "alpha").await;
}

#[tokio::test]
async fn test_byte_fragmented_frames_are_reassembled() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(&addr).await.expect("connect");

    // Dribble a create frame one byte at a time.
    for byte in client_frame_bytes(0x1, b"slow") {
        stream.write_all(&[byte]).await.expect("write byte");
        stream.flush().await.expect("flush");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // The acknowledgment proves all fragments were reassembled.
    let mut header = [0u8; 12];
    timeout(Duration::from_secs(1), stream.read_exact(&mut header))
        .await
        .expect("timed out waiting for ack")
        .expect("read header");
    assert_eq!(
        u32::from_le_bytes(header[0..4].try_into().unwrap()),
        SERVER_SIGNATURE
    );
    assert_eq!(u32::from_le_bytes(header[4..8].try_into().unwrap()), 4);
    assert_eq!(
        u32::from_le_bytes(header[8..12].try_into().unwrap()),
        ServerMessageKind::CreatedSession.to_wire()
    );

    let mut payload = [0u8; 4];
    stream.read_exact(&mut payload).await.expect("read payload");
    assert_eq!(&payload, b"slow");
}

#[tokio::test]
async fn test_oversized_declared_length_closes_the_connection() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(&addr).await.expect("connect");

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&CLIENT_SIGNATURE.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(&0x3_u32.to_le_bytes());
    stream.write_all(&bytes).await.expect("write");

    let mut buf = [0u8; 16];
    let n = timeout(Duration::from_secs(1), stream.read(&mut buf))
        .await
        .expect("timed out waiting for close")
        .expect("read");
    assert_eq!(n, 0, "expected EOF, got {n} bytes");
}

/// Builds the raw bytes of one client frame, bypassing the codec.
fn client_frame_bytes(kind: u32, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(12 + payload.len());
    bytes.extend_from_slice(&CLIENT_SIGNATURE.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&kind.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}
