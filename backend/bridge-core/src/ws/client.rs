use crate::config::BridgeOptions;
use crate::error::ws::WsError;
use crate::ws::event::HostEvent;
use crate::ws::frame::{FrameOpcode, WsFrame, read_frame};
use crate::ws::handshake::{ResponseHead, build_request, request_query, skip_response};

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;

/// Time and size bounds for every read the client performs.
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub poll_interval: Duration,
    pub frame_timeout: Duration,
    pub handshake_timeout: Duration,
    pub max_handshake_bytes: usize,
    pub max_event_bytes: u64,
}

impl From<&BridgeOptions> for ReadLimits {
    fn from(options: &BridgeOptions) -> Self {
        Self {
            poll_interval: options.poll_interval,
            frame_timeout: options.frame_timeout,
            handshake_timeout: options.handshake_timeout,
            max_handshake_bytes: options.max_handshake_bytes,
            max_event_bytes: options.max_event_bytes,
        }
    }
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self::from(&BridgeOptions::default())
    }
}

/// Connection to the host's event server.
pub struct WsEventClient<S> {
    stream: BufReader<S>,
    limits: ReadLimits,
    fragments: Option<Vec<u8>>,
}

impl WsEventClient<TcpStream> {
    /// Open the TCP connection, bounded by the handshake timeout.
    pub async fn connect(host: &str, port: u16, limits: ReadLimits) -> Result<Self, WsError> {
        let stream = timeout(limits.handshake_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| WsError::Timeout {
                message: format!("Connecting to {host}:{port} took longer than {:?}", limits.handshake_timeout),
                location: ErrorLocation::from(Location::caller()),
            })?
            .map_err(|e| WsError::Connection {
                message: format!("Failed to connect to {host}:{port}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        info!("Connected to event server at {host}:{port}");
        Ok(Self::new(stream, limits))
    }
}

impl<S> WsEventClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, limits: ReadLimits) -> Self {
        Self {
            stream: BufReader::new(stream),
            limits,
            fragments: None,
        }
    }

    /// Send the upgrade request and skip the response header.
    ///
    /// # Errors
    ///
    /// [`WsError::Handshake`] if the request cannot be written, or the
    /// response header does not end within the byte or time ceiling.
    pub async fn handshake(
        &mut self,
        host: &str,
        port: u16,
        extension_id: &str,
        connect_token: &RedactedToken,
    ) -> Result<ResponseHead, WsError> {
        let query = request_query(extension_id, connect_token);
        let request = build_request(host, port, &query, &generate_key());

        self.stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| WsError::Handshake {
                message: format!("Failed to send upgrade request: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
        self.stream.flush().await?;
        debug!("Sent upgrade request for extension {extension_id}");

        let head = timeout(
            self.limits.handshake_timeout,
            skip_response(&mut self.stream, self.limits.max_handshake_bytes),
        )
        .await
        .map_err(|_| WsError::Handshake {
            message: format!(
                "Upgrade response not finished within {:?}",
                self.limits.handshake_timeout
            ),
            location: ErrorLocation::from(Location::caller()),
        })??;

        if head.is_switching_protocols() {
            info!("Event server accepted upgrade");
        } else {
            warn!("Event server answered upgrade with '{}'", head.status_line);
        }

        Ok(head)
    }

    /// Wait up to one poll interval for the next event.
    ///
    /// Returns `Ok(None)` when nothing arrived in time, or when the frame
    /// read was a control frame or a non-final fragment.
    ///
    /// # Errors
    ///
    /// - [`WsError::PeerClosed`] on EOF or a close frame
    /// - [`WsError::Timeout`] if a started frame does not complete
    /// - [`WsError::Decode`] for malformed frames or envelopes
    pub async fn read_event(&mut self) -> Result<Option<HostEvent>, WsError> {
        // fill_buf is cancel-safe: a timeout here never loses bytes.
        match timeout(self.limits.poll_interval, self.stream.fill_buf()).await {
            Err(_) => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(buf)) if buf.is_empty() => {
                return Err(WsError::PeerClosed {
                    message: "Event server closed the connection".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Ok(Ok(_)) => {}
        }

        let frame = timeout(
            self.limits.frame_timeout,
            read_frame(&mut self.stream, self.limits.max_event_bytes),
        )
        .await
        .map_err(|_| WsError::Timeout {
            message: format!(
                "Frame not completed within {:?}",
                self.limits.frame_timeout
            ),
            location: ErrorLocation::from(Location::caller()),
        })??;

        self.accept(frame)
    }

    #[track_caller]
    fn accept(&mut self, frame: WsFrame) -> Result<Option<HostEvent>, WsError> {
        match frame.opcode {
            FrameOpcode::Close => Err(WsError::PeerClosed {
                message: format!("Event server sent close frame {}", describe_close(&frame.payload)),
                location: ErrorLocation::from(Location::caller()),
            }),
            FrameOpcode::Ping | FrameOpcode::Pong => {
                trace!("Skipping {:?} frame", frame.opcode);
                Ok(None)
            }
            FrameOpcode::Text | FrameOpcode::Binary => {
                if self.fragments.is_some() {
                    return Err(WsError::Decode {
                        message: "New message started before the previous one finished".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                if frame.fin {
                    parse_event(&frame.payload).map(Some)
                } else {
                    self.fragments = Some(frame.payload);
                    Ok(None)
                }
            }
            FrameOpcode::Continuation => {
                let Some(buffer) = self.fragments.as_mut() else {
                    return Err(WsError::Decode {
                        message: "Continuation frame without a message to continue".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                };

                buffer.extend_from_slice(&frame.payload);
                if buffer.len() as u64 > self.limits.max_event_bytes {
                    return Err(WsError::Decode {
                        message: format!("Fragmented message exceeds {} bytes", self.limits.max_event_bytes),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                if !frame.fin {
                    return Ok(None);
                }

                let payload = self.fragments.take().unwrap_or_default();
                parse_event(&payload).map(Some)
            }
        }
    }
}

#[track_caller]
fn parse_event(payload: &[u8]) -> Result<HostEvent, WsError> {
    let event: HostEvent = serde_json::from_slice(payload)?;
    trace!("Received event '{}'", event.event);
    Ok(event)
}

fn describe_close(payload: &[u8]) -> String {
    match payload {
        [hi, lo, reason @ ..] => format!(
            "(code {}, reason '{}')",
            u16::from_be_bytes([*hi, *lo]),
            String::from_utf8_lossy(reason)
        ),
        _ => "(no status)".to_string(),
    }
}
