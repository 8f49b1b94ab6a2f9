//! The event client against a real WebSocket server implementation.

use bridge_core::error::ws::WsError;
use bridge_core::ws::{HostEvent, ReadLimits, WsEventClient};

use common::RedactedToken;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

fn limits() -> ReadLimits {
    ReadLimits {
        poll_interval: Duration::from_millis(20),
        frame_timeout: Duration::from_secs(2),
        handshake_timeout: Duration::from_secs(2),
        ..ReadLimits::default()
    }
}

/// Accept one connection, send `messages`, then wait for the client to go away.
async fn start_server(messages: Vec<Message>) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let port = listener.local_addr().expect("local addr").port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("WebSocket upgrade");
        for message in messages {
            ws.send(message).await.expect("send");
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    (port, handle)
}

async fn connect(port: u16) -> WsEventClient<TcpStream> {
    let mut client = WsEventClient::connect("127.0.0.1", port, limits())
        .await
        .expect("connect");
    let head = client
        .handshake("127.0.0.1", port, "js.app", &RedactedToken::new("token"))
        .await
        .expect("handshake");
    assert!(head.is_switching_protocols(), "{}", head.status_line);
    client
}

async fn next_event(client: &mut WsEventClient<TcpStream>) -> Result<HostEvent, WsError> {
    loop {
        if let Some(event) = client.read_event().await? {
            return Ok(event);
        }
    }
}

/// **VALUE**: Verifies the upgrade request is accepted by a conforming server.
///
/// **WHY THIS MATTERS**: The request is hand-built; a missing or malformed header is
/// only caught by a real server rejecting it.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `Sec-WebSocket-Key` is not valid base64 of 16 bytes
/// - `Connection`/`Upgrade` headers are missing
/// - The response header is over- or under-read
#[tokio::test]
async fn given_real_server_when_handshaking_then_events_delivered() {
    // GIVEN: A server that sends two events
    let (port, _server) = start_server(vec![
        Message::text(json!({"event": "discord:update", "data": {"details": "Song"}}).to_string()),
        Message::text(json!({"event": "windowClose"}).to_string()),
    ])
    .await;

    // WHEN: Connecting and reading
    let mut client = connect(port).await;
    let first = next_event(&mut client).await.expect("first event");
    let second = next_event(&mut client).await.expect("second event");

    // THEN
    assert_eq!(first.event, "discord:update");
    assert_eq!(first.data["details"], "Song");
    assert_eq!(second.event, "windowClose");
}

/// **VALUE**: Verifies a message large enough for a 64-bit length header.
///
/// **BUG THIS CATCHES**: Would catch the 64-bit length path being read with the
/// wrong byte order against a real encoder.
#[tokio::test]
async fn given_70000_byte_message_when_reading_then_delivered_whole() {
    let padding = "x".repeat(70_000);
    let message = json!({"event": "discord:update", "data": {"details": padding}}).to_string();
    assert!(message.len() > 0xFFFF);
    let (port, _server) = start_server(vec![Message::text(message)]).await;

    let mut client = connect(port).await;
    let event = next_event(&mut client).await.expect("event");

    assert_eq!(event.data["details"].as_str().map(str::len), Some(70_000));
}

/// **VALUE**: Verifies server pings are ignored and a close frame ends the stream.
#[tokio::test]
async fn given_ping_then_close_when_reading_then_peer_closed() {
    let (port, _server) = start_server(vec![
        Message::Ping(vec![1, 2, 3].into()),
        Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "bye".into(),
        })),
    ])
    .await;

    let mut client = connect(port).await;
    let result = next_event(&mut client).await;

    assert!(
        matches!(result, Err(WsError::PeerClosed { .. })),
        "{result:?}"
    );
}
