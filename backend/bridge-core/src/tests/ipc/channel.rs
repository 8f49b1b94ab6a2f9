// Unit tests for the IPC channel against a scripted Discord peer

use crate::activity::ActivityDescriptor;
use crate::config::PresenceDefaults;
use crate::error::ipc::IpcError;
use crate::ipc::frame::{read_frame, write_frame};
use crate::ipc::{IpcChannel, IpcFrame, Opcode};

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncWriteExt, DuplexStream, duplex};

const CLIENT_ID: &str = "1462186088184549661";

/// Write a frame with an arbitrary opcode and body, bypassing the codec.
async fn write_raw(peer: &mut DuplexStream, opcode: u32, body: &[u8]) {
    let mut bytes = opcode.to_le_bytes().to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(body);
    peer.write_all(&bytes).await.expect("raw reply");
}

fn ready_reply() -> IpcFrame {
    IpcFrame::new(Opcode::Frame, json!({"cmd": "DISPATCH", "evt": "READY", "data": {"v": 1}}))
}

/// **VALUE**: Verifies the handshake payload and that exactly one reply is consumed.
///
/// **WHY THIS MATTERS**: Leaving the READY reply unread would make the first
/// SET_ACTIVITY reply look like the handshake answer, and reading two would block.
#[tokio::test]
async fn given_ready_reply_when_handshaking_then_payload_sent_and_reply_consumed() {
    // GIVEN: Discord has already queued READY
    let (ours, mut discord) = duplex(4096);
    write_frame(&mut discord, &ready_reply()).await.expect("reply");
    let mut channel = IpcChannel::new(ours);

    // WHEN: Handshaking
    channel.handshake(CLIENT_ID).await.expect("handshake");

    // THEN: Discord saw opcode 0 with version and client id
    let sent = read_frame(&mut discord).await.expect("handshake frame");
    assert_eq!(sent.opcode, Opcode::Handshake);
    assert_eq!(sent.payload, json!({"v": 1, "client_id": CLIENT_ID}));
}

/// **VALUE**: Verifies a silent peer makes the handshake time out.
///
/// **BUG THIS CATCHES**: Would catch an unbounded read hanging the bridge forever when
/// a stale socket file has a listener that never answers.
#[tokio::test]
async fn given_silent_peer_when_handshaking_then_timeout() {
    let (ours, _discord) = duplex(4096);
    let mut channel = IpcChannel::new(ours).with_response_timeout(Duration::from_millis(50));

    let result = channel.handshake(CLIENT_ID).await;

    assert!(matches!(result, Err(IpcError::Timeout { .. })), "{result:?}");
}

/// **VALUE**: Verifies a peer hanging up mid-handshake is a handshake error.
#[tokio::test]
async fn given_peer_closed_when_handshaking_then_handshake_error() {
    let (ours, discord) = duplex(4096);
    drop(discord);
    let mut channel = IpcChannel::new(ours);

    let result = channel.handshake(CLIENT_ID).await;

    assert!(
        matches!(
            result,
            Err(IpcError::Handshake { .. }) | Err(IpcError::Send { .. })
        ),
        "{result:?}"
    );
}

/// **VALUE**: Verifies a CLOSE reply to the handshake is tolerated.
#[tokio::test]
async fn given_close_reply_when_handshaking_then_ok() {
    let (ours, mut discord) = duplex(4096);
    let close = IpcFrame::new(Opcode::Close, json!({"code": 4000, "message": "Invalid Client ID"}));
    write_frame(&mut discord, &close).await.expect("reply");
    let mut channel = IpcChannel::new(ours);

    assert!(channel.handshake(CLIENT_ID).await.is_ok());
}

/// **VALUE**: Verifies the SET_ACTIVITY shape for both set and clear, with fresh nonces.
///
/// **WHY THIS MATTERS**: Discord clears presence only for an explicit `activity: null`;
/// omitting the key is rejected. Reused nonces make replies ambiguous.
#[tokio::test]
async fn given_set_then_clear_when_sent_then_activity_then_null_with_distinct_nonces() {
    // GIVEN
    let (ours, mut discord) = duplex(16 * 1024);
    let mut channel = IpcChannel::new(ours);
    let idle = ActivityDescriptor::idle(&PresenceDefaults::default());

    // WHEN
    channel.send_activity(77, Some(&idle)).await.expect("set");
    channel.send_activity(77, None).await.expect("clear");

    // THEN
    let set = read_frame(&mut discord).await.expect("set frame");
    let clear = read_frame(&mut discord).await.expect("clear frame");

    assert_eq!(set.opcode, Opcode::Frame);
    assert_eq!(set.payload["cmd"], "SET_ACTIVITY");
    assert_eq!(set.payload["args"]["pid"], 77);
    assert_eq!(set.payload["args"]["activity"]["details"], "Idling");

    let clear_args = clear.payload["args"].as_object().expect("args object");
    assert!(clear_args.contains_key("activity"));
    assert!(clear_args["activity"].is_null());

    assert_ne!(set.payload["nonce"], clear.payload["nonce"]);
}

/// **VALUE**: Verifies replies that already arrived are drained after each send.
///
/// **BUG THIS CATCHES**: Would catch replies accumulating until the socket buffer
/// fills and Discord stops reading our commands.
#[tokio::test]
async fn given_queued_replies_when_sending_then_drained_without_blocking() {
    // GIVEN: Two replies waiting, one of them an error
    let (ours, mut discord) = duplex(16 * 1024);
    let error = IpcFrame::new(
        Opcode::Frame,
        json!({"cmd": "SET_ACTIVITY", "evt": "ERROR", "data": {"message": "bad asset"}}),
    );
    write_frame(&mut discord, &ready_reply()).await.expect("reply");
    write_frame(&mut discord, &error).await.expect("error reply");
    let mut channel = IpcChannel::new(ours);

    // WHEN: Sending, then sending again
    channel.send_activity(1, None).await.expect("first send");
    channel.send_activity(1, None).await.expect("second send");

    // THEN: Both commands reached Discord and nothing errored
    assert!(read_frame(&mut discord).await.is_ok());
    assert!(read_frame(&mut discord).await.is_ok());
}

/// **VALUE**: Verifies Discord going away is reported on the next send.
#[tokio::test]
async fn given_peer_gone_when_sending_then_error() {
    let (ours, discord) = duplex(16 * 1024);
    let mut channel = IpcChannel::new(ours);
    drop(discord);

    let result = channel.send_activity(1, None).await;

    assert!(
        matches!(result, Err(IpcError::Send { .. }) | Err(IpcError::Read { .. })),
        "{result:?}"
    );
}

/// **VALUE**: Verifies the handshake reply's content is never validated.
///
/// **WHY THIS MATTERS**: The reply is read only to keep the stream in step. Rejecting a
/// body that is not JSON, or an opcode this client does not know, would abort the whole
/// bridge over a reply whose content it never uses.
///
/// **BUG THIS CATCHES**: Would catch the handshake decoding the reply as a typed frame.
#[tokio::test]
async fn given_non_json_or_unknown_opcode_reply_when_handshaking_then_ok() {
    for (opcode, body) in [(1u32, &b"ok!"[..]), (42, &b"{}"[..]), (1, &b""[..])] {
        // GIVEN: Discord answers with an uninterpretable frame
        let (ours, mut discord) = duplex(4096);
        write_raw(&mut discord, opcode, body).await;
        let mut channel = IpcChannel::new(ours);

        // WHEN: Handshaking
        let result = channel.handshake(CLIENT_ID).await;

        // THEN: The handshake succeeds and the reply was consumed exactly
        assert!(result.is_ok(), "opcode {opcode} body {body:?}: {result:?}");
        channel.send_activity(1, None).await.expect("send after handshake");
        let handshake = read_frame(&mut discord).await.expect("handshake frame");
        let command = read_frame(&mut discord).await.expect("command frame");
        assert_eq!(handshake.opcode, Opcode::Handshake);
        assert_eq!(command.payload["cmd"], "SET_ACTIVITY");
    }
}

/// **VALUE**: Verifies an uninterpretable reply to a command does not fail the send.
///
/// **BUG THIS CATCHES**: Would catch the drain decoding replies strictly, which ends
/// the event loop as a presence failure after the command was already delivered.
#[tokio::test]
async fn given_non_json_reply_queued_when_sending_then_send_succeeds() {
    // GIVEN: A garbage reply followed by a normal one
    let (ours, mut discord) = duplex(16 * 1024);
    write_raw(&mut discord, 1, b"not json at all").await;
    write_raw(&mut discord, 7, br#"{"evt":null}"#).await;
    write_frame(&mut discord, &ready_reply()).await.expect("reply");
    let mut channel = IpcChannel::new(ours);

    // WHEN
    let first = channel.send_activity(1, None).await;
    let second = channel.send_activity(1, None).await;

    // THEN
    assert!(first.is_ok(), "{first:?}");
    assert!(second.is_ok(), "{second:?}");
}

/// **VALUE**: Verifies the frame length ceiling still applies to replies.
///
/// **WHY THIS MATTERS**: A corrupt length means the stream is out of step; reading it
/// would allocate gigabytes and then misparse everything after it.
#[tokio::test]
async fn given_reply_with_absurd_length_when_handshaking_then_handshake_error() {
    let (ours, mut discord) = duplex(4096);
    let mut header = 1u32.to_le_bytes().to_vec();
    header.extend_from_slice(&u32::MAX.to_le_bytes());
    discord.write_all(&header).await.expect("header");
    let mut channel = IpcChannel::new(ours);

    let result = channel.handshake(CLIENT_ID).await;

    assert!(matches!(result, Err(IpcError::Handshake { .. })), "{result:?}");
}
