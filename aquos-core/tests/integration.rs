//! Integration tests: handshake, command round-trips, reconnection and
//! error scenarios against a scripted TV on localhost.

use std::io;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

use aquos_core::{
    AquosClient, AquosError, ClientConfig, ConnectionInfo, Connector, Framing, SETUP,
};

const LIMIT: Duration = Duration::from_secs(5);

// ── Helpers ──────────────────────────────────────────────────────

/// Listener on an OS-assigned port plus a config pointing at it.
async fn ephemeral_tv() -> (TcpListener, ClientConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ClientConfig::new(addr.ip().to_string())
        .with_port(addr.port())
        .with_reconnect_delay(Duration::from_millis(10));
    (listener, config)
}

/// Read exactly `len` bytes as text.
async fn read_str(stream: &mut TcpStream, len: usize) -> String {
    let mut buf = vec![0u8; len];
    timeout(LIMIT, stream.read_exact(&mut buf))
        .await
        .expect("timeout waiting for client bytes")
        .unwrap();
    String::from_utf8(buf).unwrap()
}

/// Assert the client writes nothing for a short while.
async fn assert_silent(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let read = timeout(Duration::from_millis(150), stream.read(&mut buf)).await;
    assert!(read.is_err(), "client wrote while it should have been silent");
}

/// Accept one connection and complete an unauthenticated handshake.
async fn accept_ready(listener: &TcpListener) -> TcpStream {
    let (mut stream, _) = timeout(LIMIT, listener.accept()).await.unwrap().unwrap();
    assert_eq!(read_str(&mut stream, SETUP.len()).await, SETUP);
    stream.write_all(b"OK\r").await.unwrap();
    stream
}

// ── Handshake ────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_prompt_without_credentials() {
    let (listener, config) = ephemeral_tv().await;

    let tv = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        assert_eq!(read_str(&mut stream, SETUP.len()).await, SETUP);
        stream.write_all(b"Login:").await.unwrap();

        // The client hangs up...
        let mut rest = Vec::new();
        let _ = timeout(LIMIT, stream.read_to_end(&mut rest)).await.unwrap();
        // ...and does not come back.
        let retried = timeout(Duration::from_millis(200), listener.accept()).await.is_ok();
        (rest, retried)
    });

    let result = timeout(LIMIT, AquosClient::connect(config)).await.unwrap();
    assert!(matches!(result, Err(AquosError::AuthRequired)));

    let (rest, retried) = tv.await.unwrap();
    assert!(rest.is_empty());
    assert!(!retried);
}

#[tokio::test]
async fn test_authenticated_handshake() {
    let (listener, config) = ephemeral_tv().await;
    let config = config.with_credentials("admin", "secret");

    let tv = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        // Nothing is sent before the prompt.
        assert_silent(&mut stream).await;
        stream.write_all(b"Login:").await.unwrap();

        let expected = format!("admin\nsecret\n{SETUP}");
        assert_eq!(read_str(&mut stream, expected.len()).await, expected);
        stream.write_all(b"OK\r").await.unwrap();

        assert_eq!(read_str(&mut stream, 9).await, "POWR1   \r");
        stream.write_all(b"OK\r").await.unwrap();
        stream
    });

    let client = assert_ok!(timeout(LIMIT, AquosClient::connect(config)).await.unwrap());
    assert!(client.state().is_ready());

    let reply = assert_ok!(client.power(Some(true)).await);
    assert!(reply.is_ok());

    let _stream = tv.await.unwrap();
    client.close().await;
}

#[tokio::test]
async fn test_invalid_credentials() {
    let (listener, config) = ephemeral_tv().await;
    let config = config.with_credentials("admin", "wrong");

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"Login:").await.unwrap();
        let _ = read_str(&mut stream, "admin\nwrong\n".len() + SETUP.len()).await;
        stream
            .write_all(b"User Name or Password mismatch\r\n")
            .await
            .unwrap();
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
    });

    let result = timeout(LIMIT, AquosClient::connect(config)).await.unwrap();
    assert!(matches!(result, Err(AquosError::InvalidCredentials)));
}

#[tokio::test]
async fn test_first_connection_failure_is_reported() {
    let (listener, config) = ephemeral_tv().await;
    drop(listener);

    let result = timeout(LIMIT, AquosClient::connect(config)).await.unwrap();
    assert!(matches!(result, Err(AquosError::Connection(_))));
}

// ── Commands ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_wire_formatting() {
    let (listener, config) = ephemeral_tv().await;

    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        let mut seen = Vec::new();
        for reply in ["OK\r", "OK\r", "OK\r"] {
            seen.push(read_str(&mut stream, 9).await);
            stream.write_all(reply.as_bytes()).await.unwrap();
        }
        seen
    });

    let client = assert_ok!(AquosClient::connect(config).await);
    assert_ok!(client.volume(Some(5)).await);
    assert_ok!(client.channel(Some(12)).await);
    assert_ok!(client.power(Some(true)).await);

    let seen = tv.await.unwrap();
    assert_eq!(seen, vec!["VOLM05  \r", "CTBD12  \r", "POWR1   \r"]);
}

#[tokio::test]
async fn test_range_validation_writes_nothing() {
    let (listener, config) = ephemeral_tv().await;

    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        // The first bytes after the handshake are the valid query.
        let first = read_str(&mut stream, 9).await;
        stream.write_all(b"1\r").await.unwrap();
        first
    });

    let client = assert_ok!(AquosClient::connect(config).await);
    for result in [
        client.volume(Some(61)).await,
        client.volume(Some(-1)).await,
        client.input(Some(0)).await,
        client.input(Some(10)).await,
    ] {
        assert!(matches!(result, Err(AquosError::Range { .. })));
    }

    let reply = assert_ok!(client.power(None).await);
    assert_eq!(reply.as_bool(), Some(true));
    assert_eq!(tv.await.unwrap(), "POWR?   \r");
}

#[tokio::test]
async fn test_single_in_flight_no_cross_resolution() {
    let (listener, config) = ephemeral_tv().await;

    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        for _ in 0..2 {
            let cmd = read_str(&mut stream, 9).await;
            // Only one command may be on the wire at a time.
            assert_silent(&mut stream).await;
            let reply: &[u8] = if cmd.starts_with("POWR") { b"1\r" } else { b"25\r" };
            stream.write_all(reply).await.unwrap();
        }
        stream
    });

    let client = assert_ok!(AquosClient::connect(config).await);
    let (power, volume) = tokio::join!(client.power(None), client.volume(None));

    assert_eq!(assert_ok!(power).text(), "1");
    assert_eq!(assert_ok!(volume).as_number(), Some(25));
    let _stream = tv.await.unwrap();
}

#[tokio::test]
async fn test_busy_rejection_with_zero_queue() {
    let (listener, config) = ephemeral_tv().await;
    let config = config.with_queue_depth(0);
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        assert_eq!(read_str(&mut stream, 9).await, "POWR?   \r");
        release_rx.await.unwrap();
        stream.write_all(b"0\r").await.unwrap();
        stream
    });

    let client = assert_ok!(AquosClient::connect(config).await);
    let first = tokio::spawn({
        let client = client.clone();
        async move { client.power(None).await }
    });
    // Let the first command reach the wire.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = client.mute(None).await;
    assert!(matches!(second, Err(AquosError::Busy)));

    release_tx.send(()).unwrap();
    let first = assert_ok!(first.await.unwrap());
    assert_eq!(first.as_bool(), Some(false));
    let _stream = tv.await.unwrap();
}

#[tokio::test]
async fn test_device_error_keeps_connection() {
    let (listener, config) = ephemeral_tv().await;

    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        assert_eq!(read_str(&mut stream, 9).await, "IAVD9   \r");
        stream.write_all(b"ERR\r").await.unwrap();
        assert_eq!(read_str(&mut stream, 9).await, "IAVD?   \r");
        stream.write_all(b"1\r").await.unwrap();
        stream
    });

    let client = assert_ok!(AquosClient::connect(config).await);
    let err = assert_err!(client.input(Some(9)).await);
    assert!(matches!(err, AquosError::Wire(text) if text.contains("ERR")));

    let reply = assert_ok!(client.input(None).await);
    assert_eq!(reply.as_number(), Some(1));
    let _stream = tv.await.unwrap();
}

// ── Reconnection ─────────────────────────────────────────────────

#[tokio::test]
async fn test_reconnect_after_close() {
    let (listener, config) = ephemeral_tv().await;
    let (second_tx, second_rx) = oneshot::channel::<()>();

    let tv = tokio::spawn(async move {
        let first = accept_ready(&listener).await;
        drop(first);

        let (mut stream, _) = timeout(LIMIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(read_str(&mut stream, SETUP.len()).await, SETUP);
        second_tx.send(()).unwrap();
        stream.write_all(b"OK\r").await.unwrap();

        assert_eq!(read_str(&mut stream, 9).await, "MUTE?   \r");
        stream.write_all(b"2\r").await.unwrap();
        stream
    });

    let client = assert_ok!(AquosClient::connect(config).await);

    // The client reconnects on its own.
    timeout(LIMIT, second_rx).await.unwrap().unwrap();
    let mut state = client.watch_state();
    timeout(LIMIT, state.wait_for(|s| s.is_ready()))
        .await
        .unwrap()
        .unwrap();

    let reply = assert_ok!(client.mute(None).await);
    assert_eq!(reply.as_bool(), Some(false));
    let _stream = tv.await.unwrap();
}

#[tokio::test]
async fn test_reconnect_survives_refused_attempts() {
    let (listener, config) = ephemeral_tv().await;
    let addr = listener.local_addr().unwrap();

    let (first, client) = tokio::join!(accept_ready(&listener), AquosClient::connect(config));
    let client = assert_ok!(client);

    // The TV goes away entirely; every reconnect attempt is refused.
    drop(first);
    drop(listener);
    let mut state = client.watch_state();
    timeout(LIMIT, state.wait_for(|s| !s.is_ready()))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Back on the same address.
    let listener = TcpListener::bind(addr).await.unwrap();
    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        assert_eq!(read_str(&mut stream, 9).await, "POWR?   \r");
        stream.write_all(b"1\r").await.unwrap();
        stream
    });

    let reply = assert_ok!(timeout(LIMIT, client.power(None)).await.unwrap());
    assert_eq!(reply.as_bool(), Some(true));
    assert!(client.state().is_ready());
    let _stream = tv.await.unwrap();
}

#[tokio::test]
async fn test_timeout_recycles_connection() {
    let (listener, config) = ephemeral_tv().await;
    let config = config.with_command_timeout(Some(Duration::from_millis(100)));

    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        assert_eq!(read_str(&mut stream, 9).await, "POWR?   \r");
        // Never answer; the client gives up and hangs up.
        let mut rest = Vec::new();
        let _ = timeout(LIMIT, stream.read_to_end(&mut rest)).await.unwrap();

        let mut stream = accept_ready(&listener).await;
        assert_eq!(read_str(&mut stream, 9).await, "POWR?   \r");
        stream.write_all(b"1\r").await.unwrap();
        stream
    });

    let client = assert_ok!(AquosClient::connect(config).await);
    let err = assert_err!(client.power(None).await);
    assert!(matches!(err, AquosError::Timeout(_)));

    // Held while the connection is recycled, then sent on the new one.
    let reply = assert_ok!(timeout(LIMIT, client.power(None)).await.unwrap());
    assert_eq!(reply.as_bool(), Some(true));
    let _stream = tv.await.unwrap();
}

#[tokio::test]
async fn test_close_is_final() {
    let (listener, config) = ephemeral_tv().await;

    let tv = tokio::spawn(async move {
        let mut stream = accept_ready(&listener).await;
        let mut rest = Vec::new();
        let _ = timeout(LIMIT, stream.read_to_end(&mut rest)).await.unwrap();
        timeout(Duration::from_millis(200), listener.accept()).await.is_ok()
    });

    let client = assert_ok!(AquosClient::connect(config).await);
    client.close().await;

    let reconnected = tv.await.unwrap();
    assert!(!reconnected);
    assert!(matches!(client.power(None).await, Err(AquosError::Closed)));
}

// ── In-memory transport ──────────────────────────────────────────

/// Hands out one pre-made duplex stream, then refuses.
struct DuplexConnector {
    stream: Mutex<Option<DuplexStream>>,
}

#[async_trait]
impl Connector for DuplexConnector {
    type Stream = DuplexStream;

    async fn connect(&self, _info: &ConnectionInfo) -> io::Result<DuplexStream> {
        self.stream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))
    }
}

#[tokio::test]
async fn test_chunk_framing_over_duplex() {
    let (client_end, mut tv_end) = tokio::io::duplex(256);
    let connector = DuplexConnector {
        stream: Mutex::new(Some(client_end)),
    };
    let config = ClientConfig::new("tv.test").with_framing(Framing::Chunk);

    let tv = tokio::spawn(async move {
        let mut buf = [0u8; 9];
        tv_end.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, SETUP.as_bytes());
        tv_end.write_all(b"OK\r").await.unwrap();

        tv_end.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"RCKY59  \r");
        tv_end.write_all(b"OK\r").await.unwrap();
        tv_end
    });

    let (client, ready) = AquosClient::spawn(config, connector);
    assert_ok!(timeout(LIMIT, ready).await.unwrap().unwrap());

    let reply = assert_ok!(client.netflix().await);
    // Chunk framing hands over the raw read, terminator included.
    assert_eq!(reply.raw(), "OK\r");

    let _tv_end = tv.await.unwrap();
    client.close().await;
}
