//! Discord desktop IPC channel client.
//!
//! Discord listens on a local stream socket (`discord-ipc-0` ..
//! `discord-ipc-9` under the runtime directory, or the same names as named
//! pipes on Windows). Every message in either direction is one frame:
//!
//! ```text
//! +----------------+----------------+---------------------------+
//! | opcode u32 LE  | length u32 LE  | `length` bytes UTF-8 JSON |
//! +----------------+----------------+---------------------------+
//! ```
//!
//! The bridge only ever sends two commands: the opcode-0 handshake and
//! opcode-1 `SET_ACTIVITY` frames.

mod channel;
pub mod discovery;
pub mod frame;

pub use channel::{IpcChannel, PlatformStream, connect};
pub use discovery::{discover, discover_in};
pub use frame::{IpcFrame, Opcode};
