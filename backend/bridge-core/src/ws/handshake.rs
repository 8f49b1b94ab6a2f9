//! Client side of the HTTP upgrade.

use crate::error::ws::WsError;

use common::{ErrorLocation, RedactedToken};

use std::panic::Location;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use url::form_urlencoded::Serializer as QuerySerializer;

const WEBSOCKET_VERSION: u8 = 13;
const SWITCHING_PROTOCOLS: &str = "101";

/// Query string carrying the host's extension credentials.
pub fn request_query(extension_id: &str, connect_token: &RedactedToken) -> String {
    QuerySerializer::new(String::new())
        .append_pair("extensionId", extension_id)
        .append_pair("connectToken", connect_token.expose())
        .finish()
}

/// The full upgrade request, headers terminated by a blank line.
pub fn build_request(host: &str, port: u16, query: &str, key: &str) -> String {
    format!(
        "GET /?{query} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: {WEBSOCKET_VERSION}\r\n\
         \r\n"
    )
}

/// What was observed of the upgrade response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status_line: String,
    pub bytes_consumed: usize,
}

impl ResponseHead {
    pub fn is_switching_protocols(&self) -> bool {
        self.status_line.split_whitespace().nth(1) == Some(SWITCHING_PROTOCOLS)
    }
}

/// Consume the response header up to and including the blank line.
///
/// Reads line by line so that a frame sent immediately after the header
/// stays in the buffer. Status and `Sec-WebSocket-Accept` are not checked.
///
/// # Errors
///
/// Returns [`WsError::Handshake`] if the peer closes first, or if
/// `max_bytes` are consumed without reaching the blank line.
pub async fn skip_response<R>(reader: &mut R, max_bytes: usize) -> Result<ResponseHead, WsError>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0usize;
    let mut status_line: Option<String> = None;

    loop {
        let remaining = max_bytes.saturating_sub(consumed);
        if remaining == 0 {
            return Err(WsError::Handshake {
                message: format!("Response header exceeded {max_bytes} bytes"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut line = Vec::new();
        let read = (&mut *reader)
            .take(remaining as u64)
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| WsError::Handshake {
                message: format!("Failed to read upgrade response: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if read == 0 {
            return Err(WsError::Handshake {
                message: "Event server closed before finishing the upgrade response".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        consumed += read;

        if !line.ends_with(b"\n") {
            continue;
        }

        if line == b"\r\n" || line == b"\n" {
            return Ok(ResponseHead {
                status_line: status_line.unwrap_or_default(),
                bytes_consumed: consumed,
            });
        }

        if status_line.is_none() {
            status_line = Some(String::from_utf8_lossy(&line).trim_end().to_string());
        }
    }
}
