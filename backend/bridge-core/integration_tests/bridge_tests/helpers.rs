//! Test helpers for bridge lifecycle tests.
//!
//! Both peers of the bridge are scripted over in-memory streams:
//! - a fake Discord that answers the handshake and records every frame
//! - a fake host event server that answers the upgrade and pushes frames

use bridge_core::config::{BridgeOptions, StartupConfig};
use bridge_core::ipc::frame::{read_frame, write_frame};
use bridge_core::ipc::{IpcFrame, Opcode};

use common::RedactedToken;

use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

pub const HOST_PID: u32 = 4242;
pub const HOST_PORT: u16 = 53421;
pub const EXTENSION_ID: &str = "js.neutralino.discordrpc";
pub const CONNECT_TOKEN: &str = "token-for-tests";
pub const STREAM_CAPACITY: usize = 256 * 1024;

/// Options with every delay shrunk so a full run takes milliseconds.
pub fn fast_options() -> BridgeOptions {
    BridgeOptions {
        poll_interval: Duration::from_millis(20),
        frame_timeout: Duration::from_millis(500),
        handshake_timeout: Duration::from_millis(500),
        settle_delay: Duration::ZERO,
        cleanup_grace: Duration::ZERO,
        ..BridgeOptions::default()
    }
}

pub fn startup_config() -> StartupConfig {
    StartupConfig {
        port: HOST_PORT,
        extension_id: EXTENSION_ID.to_string(),
        connect_token: RedactedToken::new(CONNECT_TOKEN),
    }
}

/// Fake Discord: answer the handshake with READY, then record frames until EOF.
pub fn spawn_discord(stream: DuplexStream) -> JoinHandle<Vec<IpcFrame>> {
    tokio::spawn(async move {
        let mut stream = stream;
        let handshake = read_frame(&mut stream)
            .await
            .expect("Failed to read handshake");
        assert_eq!(handshake.opcode, Opcode::Handshake);

        let ready = IpcFrame::new(
            Opcode::Frame,
            json!({"cmd": "DISPATCH", "evt": "READY", "data": {"v": 1}}),
        );
        write_frame(&mut stream, &ready)
            .await
            .expect("Failed to send READY");

        let mut frames = Vec::new();
        while let Ok(frame) = read_frame(&mut stream).await {
            frames.push(frame);
        }
        frames
    })
}

/// Fake host: read the upgrade request, answer 101 followed by `frames`.
///
/// The stream is handed back through the join handle so the connection stays
/// open until the test awaits it.
pub fn spawn_host(stream: DuplexStream, frames: Vec<Vec<u8>>) -> JoinHandle<(String, DuplexStream)> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let request = answer_upgrade(&mut reader, frames).await;
        (request, reader.into_inner())
    })
}

/// Fake host that answers the upgrade, sends `frames`, and disconnects.
pub fn spawn_departing_host(stream: DuplexStream, frames: Vec<Vec<u8>>) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        answer_upgrade(&mut reader, frames).await
    })
}

/// Fake host that hangs up right after reading the upgrade request.
pub fn spawn_rejecting_host(stream: DuplexStream) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        read_request(&mut reader).await
    })
}

async fn answer_upgrade(reader: &mut BufReader<DuplexStream>, frames: Vec<Vec<u8>>) -> String {
    let request = read_request(reader).await;

    let mut reply =
        b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n"
            .to_vec();
    for frame in frames {
        reply.extend(frame);
    }
    reader
        .get_mut()
        .write_all(&reply)
        .await
        .expect("Failed to send upgrade response");

    request
}

async fn read_request(reader: &mut BufReader<DuplexStream>) -> String {
    let mut request = Vec::new();
    loop {
        let mut line = Vec::new();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .expect("Failed to read upgrade request");
        request.extend_from_slice(&line);
        if read == 0 || line == b"\r\n" {
            break;
        }
    }
    String::from_utf8(request).expect("Upgrade request is not UTF-8")
}

/// Unmasked, final text frame carrying `message` as JSON.
pub fn event_frame(message: Value) -> Vec<u8> {
    let payload = message.to_string().into_bytes();
    let mut frame = vec![0x81];
    match payload.len() {
        len @ 0..=125 => frame.push(len as u8),
        len @ 126..=0xFFFF => {
            frame.push(126);
            frame.extend_from_slice(&(len as u16).to_be_bytes());
        }
        len => {
            frame.push(127);
            frame.extend_from_slice(&(len as u64).to_be_bytes());
        }
    }
    frame.extend(payload);
    frame
}

pub fn update(details: &str) -> Vec<u8> {
    event_frame(json!({
        "event": "discord:update",
        "data": {"details": details, "state": "Artist", "largeImageKey": "https://cdn/cover.png"}
    }))
}

pub fn named(event: &str) -> Vec<u8> {
    event_frame(json!({"event": event}))
}

/// The `activity` argument of every recorded SET_ACTIVITY command.
pub fn activities(frames: &[IpcFrame]) -> Vec<Value> {
    frames
        .iter()
        .map(|frame| {
            assert_eq!(frame.payload["cmd"], "SET_ACTIVITY");
            assert_eq!(frame.payload["args"]["pid"], HOST_PID);
            frame.payload["args"]["activity"].clone()
        })
        .collect()
}

/// Details line of each activity, with `None` standing for a clear.
pub fn details_sequence(frames: &[IpcFrame]) -> Vec<Option<String>> {
    activities(frames)
        .iter()
        .map(|activity| activity["details"].as_str().map(str::to_string))
        .collect()
}
