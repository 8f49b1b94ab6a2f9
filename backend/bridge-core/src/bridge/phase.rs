use crate::error::ipc::IpcError;
use crate::error::ws::WsError;

use std::fmt::{Display, Formatter, Result as FormatResult};

/// Lifecycle position of a bridge run. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BridgePhase {
    Init,
    ConnectIpc,
    IpcHandshake,
    SetIdle,
    ConnectWs,
    WsHandshake,
    EventLoop,
    Cleanup,
    Terminated,
}

impl Display for BridgePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            BridgePhase::Init => "INIT",
            BridgePhase::ConnectIpc => "CONNECT_IPC",
            BridgePhase::IpcHandshake => "IPC_HANDSHAKE",
            BridgePhase::SetIdle => "SET_IDLE",
            BridgePhase::ConnectWs => "CONNECT_WS",
            BridgePhase::WsHandshake => "WS_HANDSHAKE",
            BridgePhase::EventLoop => "EVENT_LOOP",
            BridgePhase::Cleanup => "CLEANUP",
            BridgePhase::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Why the event loop stopped. Every variant went through cleanup.
#[derive(Debug)]
pub enum ExitReason {
    /// The watchdog found the host process gone.
    ParentExited { pid: u32 },
    /// The host sent `windowClose`.
    WindowClosed,
    /// The event server connection failed or sent garbage.
    EventSourceFailed(WsError),
    /// Discord stopped accepting commands.
    PresenceFailed(IpcError),
}
