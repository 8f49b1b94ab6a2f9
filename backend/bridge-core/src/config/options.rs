use crate::{DISCORD_CLIENT_ID, EVENT_SERVER_HOSTNAME, PRODUCT_NAME};

use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE_DELAY: Duration = Duration::from_millis(500);
const CLEANUP_GRACE: Duration = Duration::from_millis(100);
const MAX_HANDSHAKE_BYTES: usize = 16 * 1024;
const MAX_EVENT_BYTES: u64 = 16 * 1024 * 1024;

const IDLE_DETAILS: &str = "Idling";
const FALLBACK_IMAGE_KEY: &str = "steqmusic";
/// Discord activity type 2 renders as "Listening to ...".
const ACTIVITY_TYPE_LISTENING: u8 = 2;

/// Timing and identity knobs for one bridge run.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Discord application id sent in the IPC handshake.
    pub client_id: String,
    /// Host the event server listens on.
    pub event_host: String,
    /// Upper bound on one event-loop iteration; also the watchdog cadence.
    pub poll_interval: Duration,
    /// Time allowed to finish reading a frame once its first byte arrived.
    pub frame_timeout: Duration,
    /// Applies to connect + handshake on both protocols.
    pub handshake_timeout: Duration,
    /// Pause between the IPC handshake and the first presence update.
    pub settle_delay: Duration,
    /// Pause between clearing presence and closing the IPC channel.
    pub cleanup_grace: Duration,
    pub max_handshake_bytes: usize,
    pub max_event_bytes: u64,
    pub presence: PresenceDefaults,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            client_id: DISCORD_CLIENT_ID.to_string(),
            event_host: EVENT_SERVER_HOSTNAME.to_string(),
            poll_interval: POLL_INTERVAL,
            frame_timeout: FRAME_TIMEOUT,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            settle_delay: SETTLE_DELAY,
            cleanup_grace: CLEANUP_GRACE,
            max_handshake_bytes: MAX_HANDSHAKE_BYTES,
            max_event_bytes: MAX_EVENT_BYTES,
            presence: PresenceDefaults::default(),
        }
    }
}

/// Values substituted when an update leaves a field out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceDefaults {
    pub idle_details: String,
    pub product_name: String,
    pub fallback_image: String,
    pub activity_type: u8,
}

impl Default for PresenceDefaults {
    fn default() -> Self {
        Self {
            idle_details: IDLE_DETAILS.to_string(),
            product_name: PRODUCT_NAME.to_string(),
            fallback_image: FALLBACK_IMAGE_KEY.to_string(),
            activity_type: ACTIVITY_TYPE_LISTENING,
        }
    }
}
