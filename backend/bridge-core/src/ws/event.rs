use serde::Deserialize;
use serde_json::Value;

pub const UPDATE_EVENT: &str = "discord:update";
pub const CLEAR_EVENT: &str = "discord:clear";
pub const WINDOW_CLOSE_EVENT: &str = "windowClose";

/// Envelope of every message the host pushes: `{event, data}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}
