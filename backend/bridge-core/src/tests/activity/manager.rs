// Unit tests for presence deduplication over an in-memory IPC stream

use crate::activity::{ActivityStateManager, ActivityUpdate};
use crate::config::PresenceDefaults;
use crate::ipc::frame::{Opcode, read_frame};
use crate::ipc::{IpcChannel, IpcFrame};

use serde_json::Value;
use tokio::io::{DuplexStream, duplex};

const HOST_PID: u32 = 4242;

fn manager() -> (ActivityStateManager<DuplexStream>, DuplexStream) {
    let (ours, discord) = duplex(64 * 1024);
    let manager =
        ActivityStateManager::new(IpcChannel::new(ours), HOST_PID, PresenceDefaults::default());
    (manager, discord)
}

/// Collect every frame the manager wrote, up to the EOF its `close` produces.
async fn sent_frames(discord: &mut DuplexStream) -> Vec<IpcFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = read_frame(discord).await {
        frames.push(frame);
    }
    frames
}

fn song(details: &str) -> ActivityUpdate {
    ActivityUpdate {
        details: Some(details.to_string()),
        state: Some("Artist".to_string()),
        ..ActivityUpdate::default()
    }
}

fn activity_of(frame: &IpcFrame) -> &Value {
    &frame.payload["args"]["activity"]
}

/// **VALUE**: Verifies identical consecutive updates are sent only once.
///
/// **WHY THIS MATTERS**: Hosts push `discord:update` on every playback tick. Forwarding
/// all of them hits Discord's rate limit and the presence stops updating entirely.
///
/// **BUG THIS CATCHES**: Would catch a dedup key that is never stored, or compared
/// against the wrong value.
#[tokio::test]
async fn given_a_a_b_when_applied_then_two_commands_sent() {
    // GIVEN: A fresh manager
    let (mut manager, mut discord) = manager();
    let a = manager.build(&song("Song A"));
    let b = manager.build(&song("Song B"));

    // WHEN: A, A, B are applied
    let sent = [
        manager.apply(&a).await.expect("first A"),
        manager.apply(&a).await.expect("second A"),
        manager.apply(&b).await.expect("B"),
    ];
    manager.close().await.expect("close");

    // THEN: Only the first A and B went out
    assert_eq!(sent, [true, false, true]);
    let frames = sent_frames(&mut discord).await;
    assert_eq!(frames.len(), 2);
    assert_eq!(activity_of(&frames[0])["details"], "Song A");
    assert_eq!(activity_of(&frames[1])["details"], "Song B");
}

/// **VALUE**: Verifies commands are attributed to the host pid and carry the opcode-1 shape.
#[tokio::test]
async fn given_update_when_applied_then_command_shape_is_set_activity() {
    let (mut manager, mut discord) = manager();
    let descriptor = manager.build(&song("Song A"));

    manager.apply(&descriptor).await.expect("apply");
    manager.close().await.expect("close");

    let frames = sent_frames(&mut discord).await;
    assert_eq!(frames[0].opcode, Opcode::Frame);
    assert_eq!(frames[0].payload["cmd"], "SET_ACTIVITY");
    assert_eq!(frames[0].payload["args"]["pid"], HOST_PID);
    assert!(frames[0].payload["nonce"].is_string());
}

/// **VALUE**: Verifies `clear` always sends and forgets the last presence.
///
/// **WHY THIS MATTERS**: After a clear, the same song resuming must show up again.
///
/// **BUG THIS CATCHES**: Would catch a clear that leaves the old key in place, which
/// suppresses the re-send and leaves the user with no presence.
#[tokio::test]
async fn given_clear_between_identical_updates_when_applied_then_update_resent() {
    // GIVEN: A presence already showing
    let (mut manager, mut discord) = manager();
    let a = manager.build(&song("Song A"));
    manager.apply(&a).await.expect("apply");

    // WHEN: It is cleared (twice) and then re-applied
    manager.clear().await.expect("clear");
    manager.clear().await.expect("second clear");
    assert!(manager.current_key().is_none());
    let resent = manager.apply(&a).await.expect("re-apply");
    manager.close().await.expect("close");

    // THEN: update, null, null, update
    assert!(resent);
    let frames = sent_frames(&mut discord).await;
    let activities: Vec<&Value> = frames.iter().map(activity_of).collect();
    assert_eq!(activities.len(), 4);
    assert_eq!(activities[0]["details"], "Song A");
    assert!(activities[1].is_null());
    assert!(activities[2].is_null());
    assert_eq!(activities[3]["details"], "Song A");
}

/// **VALUE**: Verifies the startup idle presence is deduplicated like any other.
#[tokio::test]
async fn given_idle_set_when_empty_update_applied_then_nothing_sent() {
    let (mut manager, mut discord) = manager();

    assert!(manager.set_idle().await.expect("idle"));
    let empty = manager.build(&ActivityUpdate::default());
    assert!(!manager.apply(&empty).await.expect("apply"));
    manager.close().await.expect("close");

    let frames = sent_frames(&mut discord).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(activity_of(&frames[0])["details"], "Idling");
    assert_eq!(activity_of(&frames[0])["assets"]["large_image"], "steqmusic");
}
