use crate::bridge_tests::helpers::{
    CONNECT_TOKEN, EXTENSION_ID, HOST_PID, STREAM_CAPACITY, activities, details_sequence,
    fast_options, named, spawn_departing_host, spawn_discord, spawn_host, spawn_rejecting_host,
    startup_config, update,
};

use bridge_core::bridge::{Bridge, ExitReason};
use bridge_core::config::StartupConfig;
use bridge_core::error::CoreError;
use bridge_core::error::ipc::IpcError;
use bridge_core::error::ws::WsError;
use bridge_core::ipc::{IpcChannel, IpcFrame};
use bridge_core::watchdog::Liveness;
use bridge_core::ws::WsEventClient;

use std::time::Duration;

use tokio::io::duplex;

struct Run {
    result: Result<ExitReason, CoreError>,
    frames: Vec<IpcFrame>,
    request: String,
}

/// Run a full bridge against a fake Discord and a fake host pushing `host_frames`.
async fn run_bridge<L: Liveness>(liveness: L, host_frames: Vec<Vec<u8>>) -> Run {
    let config = startup_config();
    let options = fast_options();

    let (ipc_ours, ipc_theirs) = duplex(STREAM_CAPACITY);
    let (ws_ours, ws_theirs) = duplex(STREAM_CAPACITY);
    let discord = spawn_discord(ipc_theirs);
    let host = spawn_host(ws_theirs, host_frames);

    let result = Bridge::new(&config, &options, liveness, HOST_PID)
        .run_with(IpcChannel::new(ipc_ours), move |_host, _port, limits| async move {
            Ok::<_, WsError>(WsEventClient::new(ws_ours, limits))
        })
        .await;

    let frames = discord.await.expect("Discord task panicked");
    let (request, _stream) = host.await.expect("Host task panicked");

    Run {
        result,
        frames,
        request,
    }
}

fn always_alive(_pid: u32) -> bool {
    true
}

/// **VALUE**: Verifies the watchdog ends the loop and presence is cleared before exit.
///
/// **WHY THIS MATTERS**: When the host crashes it never sends `windowClose`. Without the
/// watchdog the bridge would live forever and Discord would keep showing the last song.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Liveness is only checked once at startup
/// - Cleanup is skipped for watchdog exits
/// - The clear is sent after the channel is closed
#[tokio::test]
async fn given_parent_dies_when_looping_then_presence_cleared_and_run_ends() {
    // GIVEN: A parent that is alive for two checks, and one pending update
    let mut checks = 0;
    let liveness = move |pid: u32| {
        assert_eq!(pid, HOST_PID);
        checks += 1;
        checks <= 2
    };

    // WHEN: The bridge runs
    let run = run_bridge(liveness, vec![update("Song A")]).await;

    // THEN: idle, the update, then an explicit null as the very last command
    assert!(
        matches!(run.result, Ok(ExitReason::ParentExited { pid: HOST_PID })),
        "{:?}",
        run.result
    );
    assert_eq!(
        details_sequence(&run.frames),
        [Some("Idling".to_string()), Some("Song A".to_string()), None]
    );
    let last = activities(&run.frames).pop().expect("at least one command");
    assert!(last.is_null());
}

/// **VALUE**: Verifies the upgrade request carries the startup credentials.
#[tokio::test]
async fn given_startup_config_when_connecting_then_credentials_in_request() {
    let run = run_bridge(always_alive, vec![named("windowClose")]).await;

    assert!(run.result.is_ok());
    assert!(run.request.starts_with(&format!(
        "GET /?extensionId={EXTENSION_ID}&connectToken={CONNECT_TOKEN} HTTP/1.1\r\n"
    )));
    assert!(run.request.contains("Sec-WebSocket-Version: 13\r\n"));
}

/// **VALUE**: Verifies `windowClose` ends the loop and later events are never applied.
///
/// **BUG THIS CATCHES**: Would catch the loop continuing after `windowClose` and
/// applying an update that arrived during shutdown.
#[tokio::test]
async fn given_window_close_then_update_when_looping_then_update_ignored() {
    let run = run_bridge(
        always_alive,
        vec![named("windowClose"), update("Too late")],
    )
    .await;

    assert!(matches!(run.result, Ok(ExitReason::WindowClosed)));
    assert_eq!(
        details_sequence(&run.frames),
        [Some("Idling".to_string()), None]
    );
}

/// **VALUE**: Verifies deduplication end to end, with unknown events in between.
///
/// **WHY THIS MATTERS**: Playback ticks re-send the same song every second; each
/// duplicate reaching Discord counts toward its rate limit.
#[tokio::test]
async fn given_repeated_updates_when_looping_then_sent_once_each() {
    let run = run_bridge(
        always_alive,
        vec![
            update("Song A"),
            named("serverOffline"),
            update("Song A"),
            update("Song B"),
            named("windowClose"),
        ],
    )
    .await;

    assert!(matches!(run.result, Ok(ExitReason::WindowClosed)));
    assert_eq!(
        details_sequence(&run.frames),
        [
            Some("Idling".to_string()),
            Some("Song A".to_string()),
            Some("Song B".to_string()),
            None
        ]
    );
}

/// **VALUE**: Verifies a clear lets the same song be shown again.
///
/// **BUG THIS CATCHES**: Would catch a stale dedup key after `discord:clear` leaving
/// the user without presence when playback resumes.
#[tokio::test]
async fn given_clear_between_same_song_when_looping_then_song_resent() {
    let run = run_bridge(
        always_alive,
        vec![
            update("Song A"),
            named("discord:clear"),
            update("Song A"),
            named("windowClose"),
        ],
    )
    .await;

    assert!(run.result.is_ok());
    assert_eq!(
        details_sequence(&run.frames),
        [
            Some("Idling".to_string()),
            Some("Song A".to_string()),
            None,
            Some("Song A".to_string()),
            None
        ]
    );
}

/// **VALUE**: Verifies updates without an image keep the fallback and URLs pass through.
#[tokio::test]
async fn given_url_image_when_applied_then_sent_verbatim() {
    let run = run_bridge(always_alive, vec![update("Song A"), named("windowClose")]).await;

    let sent = activities(&run.frames);
    assert_eq!(sent[0]["assets"]["large_image"], "steqmusic");
    assert_eq!(sent[1]["assets"]["large_image"], "https://cdn/cover.png");
    assert_eq!(sent[1]["type"], 2);
}

/// **VALUE**: Verifies the host disconnecting still goes through cleanup.
#[tokio::test]
async fn given_host_hangs_up_when_looping_then_cleared_and_event_source_failed() {
    // GIVEN: A host that sends one update and disconnects
    let config = startup_config();
    let options = fast_options();
    let (ipc_ours, ipc_theirs) = duplex(STREAM_CAPACITY);
    let (ws_ours, ws_theirs) = duplex(STREAM_CAPACITY);
    let discord = spawn_discord(ipc_theirs);
    let host = spawn_departing_host(ws_theirs, vec![update("Song A")]);

    // WHEN
    let result = Bridge::new(&config, &options, always_alive, HOST_PID)
        .run_with(IpcChannel::new(ipc_ours), move |_host, _port, limits| async move {
            Ok::<_, WsError>(WsEventClient::new(ws_ours, limits))
        })
        .await;

    // THEN
    assert!(
        matches!(
            result,
            Ok(ExitReason::EventSourceFailed(WsError::PeerClosed { .. }))
        ),
        "{result:?}"
    );
    let frames = discord.await.expect("Discord task panicked");
    assert_eq!(
        details_sequence(&frames),
        [Some("Idling".to_string()), Some("Song A".to_string()), None]
    );
    assert!(host.await.expect("Host task panicked").starts_with("GET /?"));
}

/// **VALUE**: Verifies a failed upgrade aborts without sending a clear.
///
/// **WHY THIS MATTERS**: Failures before the event loop end the run directly. The idle
/// presence disappears with the IPC connection; sending a clear there is not part of
/// that path.
///
/// **BUG THIS CATCHES**: Would catch a handshake failure being swallowed and the loop
/// starting on a dead connection.
#[tokio::test]
async fn given_host_rejects_upgrade_when_connecting_then_ws_error_and_no_clear() {
    let config = startup_config();
    let options = fast_options();
    let (ipc_ours, ipc_theirs) = duplex(STREAM_CAPACITY);
    let (ws_ours, ws_theirs) = duplex(STREAM_CAPACITY);
    let discord = spawn_discord(ipc_theirs);
    let host = spawn_rejecting_host(ws_theirs);

    let result = Bridge::new(&config, &options, always_alive, HOST_PID)
        .run_with(IpcChannel::new(ipc_ours), move |_host, _port, limits| async move {
            Ok::<_, WsError>(WsEventClient::new(ws_ours, limits))
        })
        .await;

    assert!(
        matches!(result, Err(CoreError::Ws(WsError::Handshake { .. }))),
        "{result:?}"
    );
    let frames = discord.await.expect("Discord task panicked");
    assert_eq!(details_sequence(&frames), [Some("Idling".to_string())]);
    assert!(host.await.expect("Host task panicked").starts_with("GET /?"));
}

/// **VALUE**: Verifies a failed event-server connection aborts the run.
#[tokio::test]
async fn given_event_server_unreachable_when_connecting_then_ws_error() {
    // GIVEN: A port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    let config = StartupConfig {
        port,
        ..startup_config()
    };
    let options = fast_options();
    let (ipc_ours, ipc_theirs) = duplex(STREAM_CAPACITY);
    let discord = spawn_discord(ipc_theirs);

    // WHEN
    let result = Bridge::new(&config, &options, always_alive, HOST_PID)
        .run_with(IpcChannel::new(ipc_ours), |host: String, port, limits| async move {
            WsEventClient::connect(&host, port, limits).await
        })
        .await;

    // THEN
    assert!(matches!(result, Err(CoreError::Ws(_))), "{result:?}");
    assert_eq!(
        discord.await.expect("Discord task panicked").len(),
        1,
        "only the idle presence should be sent"
    );
}

/// **VALUE**: Verifies a Discord that never answers the handshake fails the run.
///
/// **BUG THIS CATCHES**: Would catch the bridge hanging forever on a stale socket.
#[tokio::test]
async fn given_silent_discord_when_handshaking_then_ipc_timeout() {
    let config = startup_config();
    let options = fast_options();
    let (ipc_ours, _ipc_theirs) = duplex(STREAM_CAPACITY);
    let (ws_ours, _ws_theirs) = duplex(STREAM_CAPACITY);

    let started = std::time::Instant::now();
    let result = Bridge::new(&config, &options, always_alive, HOST_PID)
        .run_with(IpcChannel::new(ipc_ours), move |_host, _port, limits| async move {
            Ok::<_, WsError>(WsEventClient::new(ws_ours, limits))
        })
        .await;

    assert!(
        matches!(result, Err(CoreError::Ipc(IpcError::Timeout { .. }))),
        "{result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(5));
}
