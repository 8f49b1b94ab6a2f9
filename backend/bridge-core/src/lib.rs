pub mod activity;
pub mod bridge;
pub mod config;
pub mod error;
pub mod ipc;
pub mod watchdog;
pub mod ws;


pub const PRODUCT_NAME: &str = "SteqMusic";
pub const DISCORD_CLIENT_ID: &str = "1462186088184549661";
pub const EVENT_SERVER_HOSTNAME: &str = "127.0.0.1";
pub const IPC_SOCKET_PREFIX: &str = "discord-ipc-";
#[cfg(windows)]
pub const IPC_PIPE_PREFIX: &str = const_format::concatcp!(r"\\?\pipe\", IPC_SOCKET_PREFIX);
