use crate::activity::ActivityUpdate;
use crate::ws::HostEvent;
use crate::ws::event::{CLEAR_EVENT, UPDATE_EVENT, WINDOW_CLOSE_EVENT};

/// What the event loop does with one host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Update(ActivityUpdate),
    Clear,
    Close,
    Ignore,
}

impl From<&HostEvent> for Dispatch {
    fn from(event: &HostEvent) -> Self {
        match event.event.as_str() {
            UPDATE_EVENT => Dispatch::Update(ActivityUpdate::from_data(&event.data)),
            CLEAR_EVENT => Dispatch::Clear,
            WINDOW_CLOSE_EVENT => Dispatch::Close,
            _ => Dispatch::Ignore,
        }
    }
}
