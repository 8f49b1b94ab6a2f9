//! Receive-only WebSocket client for the host's local event server.
//!
//! Only what the bridge needs from RFC 6455 is implemented: the client
//! opening handshake and decoding of inbound frames. Nothing is ever sent
//! after the upgrade request.

mod client;
pub mod event;
pub mod frame;
pub mod handshake;

pub use client::{ReadLimits, WsEventClient};
pub use event::HostEvent;
pub use frame::{FrameHeader, FrameOpcode, LengthField, WsFrame};
