//! Connected IPC channel: handshake and `SET_ACTIVITY` commands.

use crate::activity::ActivityDescriptor;
use crate::error::ipc::IpcError;
use crate::ipc::frame::{IpcFrame, Opcode, RawFrame, read_raw_frame, write_frame};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use futures_util::FutureExt;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use uuid::Uuid;

#[cfg(unix)]
pub type PlatformStream = tokio::net::UnixStream;
#[cfg(windows)]
pub type PlatformStream = tokio::net::windows::named_pipe::NamedPipeClient;

const IPC_PROTOCOL_VERSION: u32 = 1;
const SET_ACTIVITY: &str = "SET_ACTIVITY";
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct HandshakePayload<'a> {
    v: u32,
    client_id: &'a str,
}

#[derive(Serialize)]
struct SetActivityCommand<'a> {
    cmd: &'static str,
    args: SetActivityArgs<'a>,
    nonce: String,
}

#[derive(Serialize)]
struct SetActivityArgs<'a> {
    pid: u32,
    activity: Option<&'a ActivityDescriptor>,
}

/// Open the local stream to Discord.
///
/// # Errors
///
/// Returns [`IpcError::Connection`] on any OS-level failure.
#[cfg(unix)]
pub async fn connect(path: &Path) -> Result<IpcChannel<PlatformStream>, IpcError> {
    let stream = tokio::net::UnixStream::connect(path)
        .await
        .map_err(|e| IpcError::Connection {
            message: format!("Failed to connect to {}", path.display()),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

    info!("Connected to Discord IPC at {}", path.display());
    Ok(IpcChannel::new(stream))
}

#[cfg(windows)]
pub async fn connect(path: &Path) -> Result<IpcChannel<PlatformStream>, IpcError> {
    let pipe = tokio::net::windows::named_pipe::ClientOptions::new()
        .open(path)
        .map_err(|e| IpcError::Connection {
            message: format!("Failed to open pipe {}", path.display()),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

    info!("Connected to Discord IPC at {}", path.display());
    Ok(IpcChannel::new(pipe))
}

/// An open IPC connection.
///
/// Reads go through a [`BufReader`] so already-delivered responses can be
/// drained without blocking after each command.
pub struct IpcChannel<S> {
    stream: BufReader<S>,
    response_timeout: Duration,
}

impl<S> IpcChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Bound on waiting for the handshake reply and on finishing a partially received frame.
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    /// Send the opcode-0 handshake and consume exactly one reply.
    ///
    /// The reply's content is not validated: any opcode and any body are
    /// accepted. A `CLOSE` reply (bad client id, outdated protocol) is only logged.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Send`] if the handshake cannot be written
    /// - [`IpcError::Timeout`] if no reply arrives in time
    /// - [`IpcError::Handshake`] if the reply cannot be read
    pub async fn handshake(&mut self, client_id: &str) -> Result<(), IpcError> {
        let frame = IpcFrame::from_payload(
            Opcode::Handshake,
            &HandshakePayload {
                v: IPC_PROTOCOL_VERSION,
                client_id,
            },
        )?;

        write_frame(&mut self.stream, &frame).await?;

        let reply = timeout(self.response_timeout, read_raw_frame(&mut self.stream))
            .await
            .map_err(|_| IpcError::Timeout {
                message: format!(
                    "No handshake reply within {:?}",
                    self.response_timeout
                ),
                location: ErrorLocation::from(Location::caller()),
            })?
            .map_err(|e| IpcError::Handshake {
                message: format!("Failed to read handshake reply: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        match reply.parse() {
            Some(frame) if frame.opcode == Opcode::Close => {
                warn!("Discord answered the handshake with CLOSE: {}", frame.payload)
            }
            Some(frame) => debug!(
                "Handshake reply: opcode={:?} evt={}",
                frame.opcode,
                frame.payload.get("evt").unwrap_or(&Value::Null)
            ),
            None => debug!(
                "Handshake reply: opcode={} ({} bytes, not a JSON frame)",
                reply.opcode,
                reply.body.len()
            ),
        }

        Ok(())
    }

    /// Send one `SET_ACTIVITY` command. `None` clears the presence.
    pub async fn send_activity(
        &mut self,
        pid: u32,
        activity: Option<&ActivityDescriptor>,
    ) -> Result<(), IpcError> {
        let command = SetActivityCommand {
            cmd: SET_ACTIVITY,
            args: SetActivityArgs { pid, activity },
            nonce: Uuid::new_v4().to_string(),
        };

        let frame = IpcFrame::from_payload(Opcode::Frame, &command)?;
        write_frame(&mut self.stream, &frame).await?;

        debug!(
            "Sent SET_ACTIVITY nonce={} ({})",
            command.nonce,
            if activity.is_some() { "update" } else { "clear" }
        );

        self.drain_pending().await
    }

    /// Shut the stream down. Consumes the channel so it happens once.
    pub async fn close(self) -> Result<(), IpcError> {
        let mut stream = self.stream.into_inner();
        stream.shutdown().await.map_err(|e| IpcError::Send {
            message: format!("Failed to shut down IPC stream: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("Discord IPC channel closed");
        Ok(())
    }

    /// Read every reply that has already arrived, without waiting for more.
    ///
    /// Discord answers each command; leaving replies unread would eventually
    /// fill the socket buffer and stall the peer.
    async fn drain_pending(&mut self) -> Result<(), IpcError> {
        loop {
            let has_data = match self.stream.fill_buf().now_or_never() {
                None => return Ok(()),
                Some(Ok(buf)) => !buf.is_empty(),
                Some(Err(e)) => return Err(e.into()),
            };

            if !has_data {
                return Err(IpcError::Read {
                    message: "Discord closed the IPC channel".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            let reply = timeout(self.response_timeout, read_raw_frame(&mut self.stream))
                .await
                .map_err(|_| IpcError::Timeout {
                    message: "Partial reply frame never completed".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })??;

            log_reply(&reply);
        }
    }
}

fn log_reply(reply: &RawFrame) {
    let Some(frame) = reply.parse() else {
        debug!(
            "Discord reply: opcode={} ({} bytes, not a JSON frame)",
            reply.opcode,
            reply.body.len()
        );
        return;
    };

    let evt = frame.payload.get("evt").and_then(Value::as_str);

    match (frame.opcode, evt) {
        (Opcode::Close, _) => warn!("Discord sent CLOSE: {}", frame.payload),
        (_, Some("ERROR")) => warn!(
            "Discord rejected command: {}",
            frame
                .payload
                .pointer("/data/message")
                .and_then(Value::as_str)
                .unwrap_or("no message")
        ),
        _ => debug!(
            "Discord reply: cmd={} nonce={}",
            frame.payload.get("cmd").unwrap_or(&Value::Null),
            frame.payload.get("nonce").unwrap_or(&Value::Null)
        ),
    }
}
