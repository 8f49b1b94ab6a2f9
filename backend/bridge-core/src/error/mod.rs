pub mod config;
pub mod ipc;
pub mod ws;

use thiserror::Error;

/// Any failure that stops the bridge before or outside the event loop.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Ipc(#[from] ipc::IpcError),

    #[error(transparent)]
    Ws(#[from] ws::WsError),
}
