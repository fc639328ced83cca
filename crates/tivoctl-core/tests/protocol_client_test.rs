#![allow(clippy::unwrap_used)]
// Integration tests for `ProtocolClient` and `Session` over loopback TCP
// and in-memory transports.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpListener, TcpStream};

use tivoctl_api::TransportConfig;
use tivoctl_core::{
    ClientConfig, ClientEvent, CommandRequest, ConnectionState, CoreError, Device, ProtocolClient,
    RemoteButton, ResponseEvent, ResponseStream, Session,
};

// ── Helpers ─────────────────────────────────────────────────────────

const STEP: Duration = Duration::from_secs(5);

fn config_for(port: u16) -> ClientConfig {
    ClientConfig {
        transport: TransportConfig {
            port,
            ..TransportConfig::default()
        },
    }
}

async fn listener() -> (TcpListener, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, config_for(port))
}

/// Connect a client to a fresh loopback listener and accept it.
async fn setup() -> (ProtocolClient, ResponseStream, TcpStream) {
    let (listener, config) = listener().await;
    let mut client = ProtocolClient::connect("127.0.0.1", config).unwrap();
    let responses = client.responses().unwrap();
    let (server, _) = listener.accept().await.unwrap();
    tokio::time::timeout(STEP, client.wait_connected())
        .await
        .unwrap()
        .unwrap();
    (client, responses, server)
}

async fn next(responses: &mut ResponseStream) -> Option<ClientEvent> {
    tokio::time::timeout(STEP, responses.next_event()).await.unwrap()
}

fn response(event: ResponseEvent) -> Option<ClientEvent> {
    Some(ClientEvent::Response(event))
}

/// Accepts at most `limit` bytes per write and counts write calls.
struct ShortWriter {
    limit: usize,
    writes: Arc<AtomicUsize>,
}

impl AsyncWrite for ShortWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Poll::Ready(Ok(buf.len().min(self.limit)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// A transport whose every write fails with a reset.
struct BrokenWriter;

impl AsyncWrite for BrokenWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// A transport whose every read fails with a reset.
struct ResetReader;

impl AsyncRead for ResetReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)))
    }
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_send_before_connected_is_rejected_without_writing() {
    let (listener, config) = listener().await;
    let mut client = ProtocolClient::connect("127.0.0.1", config).unwrap();

    // The connect task has not run yet on this single-threaded runtime.
    assert_eq!(client.state(), ConnectionState::Connecting);
    let err = client
        .send(&CommandRequest::set_channel(42, None))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            CoreError::NotConnected {
                state: ConnectionState::Connecting
            }
        ),
        "expected NotConnected, got: {err:?}"
    );

    let (mut server, _) = listener.accept().await.unwrap();
    client.wait_connected().await.unwrap();
    client.close().await;

    let mut received = Vec::new();
    tokio::time::timeout(STEP, server.read_to_end(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert!(received.is_empty(), "nothing should have been written");
}

#[tokio::test]
async fn test_state_follows_connection() {
    let (listener, config) = listener().await;
    let client = ProtocolClient::connect("127.0.0.1", config).unwrap();
    let mut state = client.subscribe_state();

    let (_server, _) = listener.accept().await.unwrap();
    let reached = tokio::time::timeout(
        STEP,
        state.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(*reached, ConnectionState::Connected);
}

#[tokio::test]
async fn test_refused_connection_fails_once() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut client = ProtocolClient::connect("127.0.0.1", config_for(port)).unwrap();
    let mut responses = client.responses().unwrap();

    let err = tokio::time::timeout(STEP, client.wait_connected())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, CoreError::ConnectionFailed { .. }), "got: {err:?}");
    assert_eq!(client.state(), ConnectionState::Failed);

    assert!(matches!(
        next(&mut responses).await,
        Some(ClientEvent::ConnectionError { .. })
    ));
    assert_eq!(next(&mut responses).await, None);

    let err = client.send(&CommandRequest::ir_code("GUIDE")).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::NotConnected {
            state: ConnectionState::Failed
        }
    ));
}

#[tokio::test]
async fn test_close_ends_stream_without_error() {
    let (mut client, mut responses, _server) = setup().await;

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(next(&mut responses).await, None);

    let err = client.send(&CommandRequest::ir_code("GUIDE")).await.unwrap_err();
    assert!(matches!(err, CoreError::NotConnected { .. }));
}

#[tokio::test]
async fn test_drop_closes_socket() {
    let (client, _responses, mut server) = setup().await;

    drop(client);

    let mut received = Vec::new();
    let read = tokio::time::timeout(STEP, server.read_to_end(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, 0);
}

// ── Sending ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_commands_are_terminated_by_carriage_return() {
    let (client, _responses, mut server) = setup().await;

    client
        .send(&CommandRequest::set_channel(42, None))
        .await
        .unwrap();
    client
        .send(&CommandRequest::force_channel(7, Some(2)))
        .await
        .unwrap();
    client.send(&RemoteButton::Guide.request()).await.unwrap();

    let expected = b"SETCH 42\rFORCECH 7 2\rIRCODE GUIDE\r";
    let mut received = vec![0u8; expected.len()];
    tokio::time::timeout(STEP, server.read_exact(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&received[..], &expected[..]);
}

#[tokio::test]
async fn test_partial_write_is_fatal() {
    let writes = Arc::new(AtomicUsize::new(0));
    let writer = ShortWriter {
        limit: 4,
        writes: Arc::clone(&writes),
    };
    let (reader, _peer) = tokio::io::duplex(64);
    let mut client = ProtocolClient::from_io("test", reader, writer);
    let mut responses = client.responses().unwrap();

    let err = client
        .send(&CommandRequest::set_channel(42, None))
        .await
        .unwrap_err();
    match err {
        CoreError::PartialWrite {
            command,
            written,
            expected,
        } => {
            assert_eq!(command, "SETCH 42");
            assert_eq!(written, 4);
            assert_eq!(expected, 9);
        }
        other => panic!("expected PartialWrite, got: {other:?}"),
    }
    assert_eq!(client.state(), ConnectionState::Failed);

    // No further writes reach the transport.
    let err = client.send(&CommandRequest::ir_code("GUIDE")).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::NotConnected {
            state: ConnectionState::Failed
        }
    ));
    assert_eq!(writes.load(Ordering::SeqCst), 1);

    assert!(matches!(
        next(&mut responses).await,
        Some(ClientEvent::ConnectionError { .. })
    ));
    assert_eq!(next(&mut responses).await, None);
}

#[tokio::test]
async fn test_write_error_is_reported_on_stream() {
    let (reader, _peer) = tokio::io::duplex(64);
    let mut client = ProtocolClient::from_io("test", reader, BrokenWriter);
    let mut responses = client.responses().unwrap();

    let err = client.send(&CommandRequest::ir_code("GUIDE")).await.unwrap_err();
    assert!(
        matches!(err, CoreError::ConnectionFailed { .. }),
        "got: {err:?}"
    );
    assert_eq!(client.state(), ConnectionState::Failed);

    match next(&mut responses).await {
        Some(ClientEvent::ConnectionError { reason }) => {
            assert!(reason.contains("reset"), "reason: {reason}");
        }
        other => panic!("expected ConnectionError, got: {other:?}"),
    }
    assert_eq!(next(&mut responses).await, None);
}

// ── Receiving ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_responses_arrive_in_order() {
    let (client, mut responses, mut server) = setup().await;

    server
        .write_all(b"CH_STATUS 0042 LOCAL\r\nCH_FAILED NO_LIVE\r\n")
        .await
        .unwrap();
    server.write_all(b"FOO BAR\r\nLIVETV_READY\r\n").await.unwrap();
    drop(server);

    assert_eq!(
        next(&mut responses).await,
        response(ResponseEvent::ChannelChanged {
            channel: "0042".into(),
            source: "LOCAL".into()
        })
    );
    assert_eq!(
        next(&mut responses).await,
        response(ResponseEvent::ChannelFailed {
            reason: "NO_LIVE".into()
        })
    );
    assert_eq!(
        next(&mut responses).await,
        response(ResponseEvent::GenericError { code: "FOO".into() })
    );
    assert_eq!(
        next(&mut responses).await,
        response(ResponseEvent::Acknowledged {
            kind: "LIVETV_READY".into()
        })
    );

    // Clean EOF: stream ends without a connection error.
    assert_eq!(next(&mut responses).await, None);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_response_split_across_reads() {
    let (_client, mut responses, mut server) = setup().await;

    server.write_all(b"CH_STATUS 42 ").await.unwrap();
    server.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    server.write_all(b"T 7\r\n").await.unwrap();

    assert_eq!(
        next(&mut responses).await,
        response(ResponseEvent::ChannelChanged {
            channel: "42".into(),
            source: "7".into()
        })
    );
}

#[tokio::test]
async fn test_read_error_is_reported_once() {
    let (_peer, writer) = tokio::io::duplex(64);
    let mut client = ProtocolClient::from_io("test", ResetReader, writer);
    let mut responses = client.responses().unwrap();

    assert!(matches!(
        next(&mut responses).await,
        Some(ClientEvent::ConnectionError { .. })
    ));
    assert_eq!(next(&mut responses).await, None);
    assert_eq!(client.state(), ConnectionState::Failed);
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_sends_to_bound_device() {
    let (listener, config) = listener().await;
    let mut session = Session::new(config);

    let _responses = session
        .connect(Device::new("Den", "127.0.0.1"))
        .await
        .unwrap();
    let (mut server, _) = listener.accept().await.unwrap();
    tokio::time::timeout(STEP, session.wait_connected())
        .await
        .unwrap()
        .unwrap();

    session.press(RemoteButton::LiveTv).await.unwrap();
    let expected = b"IRCODE LIVETV\r";
    let mut received = vec![0u8; expected.len()];
    tokio::time::timeout(STEP, server.read_exact(&mut received))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&received[..], &expected[..]);
    assert_eq!(session.device().unwrap().name, "Den");

    session.disconnect().await;
    assert!(session.device().is_none());
    assert_eq!(session.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_session_reconnect_closes_previous_client() {
    let (listener, config) = listener().await;
    let mut session = Session::new(config);

    let mut first = session
        .connect(Device::new("Den", "127.0.0.1"))
        .await
        .unwrap();
    let (_first_server, _) = listener.accept().await.unwrap();
    session.wait_connected().await.unwrap();

    let _second = session
        .connect(Device::new("Office", "127.0.0.1"))
        .await
        .unwrap();
    assert_eq!(next(&mut first).await, None);
    assert_eq!(session.device().unwrap().name, "Office");
}
