//! Locating the Discord IPC endpoint.
//!
//! Discord binds the first free slot of `discord-ipc-0` .. `discord-ipc-9`,
//! so slots are probed in order and the first existing one wins.

use crate::IPC_SOCKET_PREFIX;
use crate::error::ipc::IpcError;

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, trace};

pub const CANDIDATE_SLOTS: usize = 10;
pub const RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";
pub const FALLBACK_RUNTIME_DIR: &str = "/tmp";

/// `$XDG_RUNTIME_DIR`, or `/tmp` when it is unset or empty.
pub fn runtime_dir() -> PathBuf {
    env::var_os(RUNTIME_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FALLBACK_RUNTIME_DIR))
}

/// Slot paths under `dir`, in probe order.
pub fn candidate_paths(dir: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    (0..CANDIDATE_SLOTS).map(move |slot| dir.join(format!("{IPC_SOCKET_PREFIX}{slot}")))
}

/// Probe the slots under `dir`.
///
/// # Errors
///
/// Returns [`IpcError::ChannelNotFound`] if no slot exists.
#[track_caller]
pub fn discover_in(dir: &Path) -> Result<PathBuf, IpcError> {
    first_existing(candidate_paths(dir), &dir.display().to_string())
}

/// Probe the slots in the platform's default location.
#[cfg(unix)]
#[track_caller]
pub fn discover() -> Result<PathBuf, IpcError> {
    let dir = runtime_dir();
    debug!("Probing Discord IPC slots under {}", dir.display());
    discover_in(&dir)
}

#[cfg(windows)]
#[track_caller]
pub fn discover() -> Result<PathBuf, IpcError> {
    debug!("Probing Discord IPC named pipes");
    let pipes = (0..CANDIDATE_SLOTS).map(|slot| PathBuf::from(format!("{}{slot}", crate::IPC_PIPE_PREFIX)));
    first_existing(pipes, "the named pipe namespace")
}

#[track_caller]
fn first_existing<I>(candidates: I, searched: &str) -> Result<PathBuf, IpcError>
where
    I: Iterator<Item = PathBuf>,
{
    for path in candidates {
        if path.exists() {
            debug!("Found Discord IPC endpoint at {}", path.display());
            return Ok(path);
        }
        trace!("No endpoint at {}", path.display());
    }

    Err(IpcError::ChannelNotFound {
        message: format!("No discord-ipc-0..{} endpoint in {searched}", CANDIDATE_SLOTS - 1),
        location: ErrorLocation::from(Location::caller()),
    })
}
