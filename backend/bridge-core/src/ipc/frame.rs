use crate::error::ipc::IpcError;

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 8;

/// Discord never sends anything close to this; larger lengths mean a desynced stream.
pub const MAX_PAYLOAD_LEN: u32 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

impl TryFrom<u32> for Opcode {
    type Error = IpcError;

    #[track_caller]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            other => Err(IpcError::Decode {
                message: format!("Unknown opcode {other}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// One IPC message: an opcode and its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct IpcFrame {
    pub opcode: Opcode,
    pub payload: Value,
}

impl IpcFrame {
    pub fn new(opcode: Opcode, payload: Value) -> Self {
        Self { opcode, payload }
    }

    #[track_caller]
    pub fn from_payload<T: Serialize>(opcode: Opcode, payload: &T) -> Result<Self, IpcError> {
        let payload = serde_json::to_value(payload).map_err(|e| IpcError::Encode {
            message: format!("Failed to serialize payload: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self { opcode, payload })
    }

    /// Header plus JSON body, ready for the wire.
    #[track_caller]
    pub fn encode(&self) -> Result<Vec<u8>, IpcError> {
        let body = serde_json::to_vec(&self.payload).map_err(|e| IpcError::Encode {
            message: format!("Failed to serialize payload: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let length = u32::try_from(body.len())
            .ok()
            .filter(|len| *len <= MAX_PAYLOAD_LEN)
            .ok_or_else(|| IpcError::Encode {
                message: format!("Payload of {} bytes exceeds frame limit", body.len()),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&(self.opcode as u32).to_le_bytes());
        bytes.extend_from_slice(&length.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode exactly one frame; trailing or missing bytes are an error.
    #[track_caller]
    pub fn decode(bytes: &[u8]) -> Result<Self, IpcError> {
        let header: [u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| IpcError::Decode {
                message: format!("Frame shorter than header: {} bytes", bytes.len()),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (opcode, length) = parse_header(header)?;
        let body = &bytes[HEADER_LEN..];

        if body.len() != length as usize {
            return Err(IpcError::Decode {
                message: format!(
                    "Header declares {length} payload bytes but {} follow",
                    body.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            opcode,
            payload: serde_json::from_slice(body)?,
        })
    }
}

#[track_caller]
fn parse_header(header: [u8; HEADER_LEN]) -> Result<(Opcode, u32), IpcError> {
    let (opcode, length) = split_header(header)?;
    Ok((Opcode::try_from(opcode)?, length))
}

/// Raw opcode and length; only the length ceiling is enforced.
#[track_caller]
fn split_header(header: [u8; HEADER_LEN]) -> Result<(u32, u32), IpcError> {
    let opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if length > MAX_PAYLOAD_LEN {
        return Err(IpcError::Decode {
            message: format!("Declared payload length {length} exceeds frame limit"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok((opcode, length))
}

/// A frame as it came off the wire, opcode and body unchecked.
///
/// Replies from Discord are consumed this way: their content never affects
/// the bridge, so an odd opcode or a non-JSON body is only worth a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub opcode: u32,
    pub body: Vec<u8>,
}

impl RawFrame {
    /// Best-effort interpretation, for logging.
    pub fn parse(&self) -> Option<IpcFrame> {
        let opcode = Opcode::try_from(self.opcode).ok()?;
        let payload = serde_json::from_slice(&self.body).ok()?;
        Some(IpcFrame { opcode, payload })
    }
}

pub async fn write_frame<W>(writer: &mut W, frame: &IpcFrame) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.encode()?;

    writer.write_all(&bytes).await.map_err(|e| IpcError::Send {
        message: format!("Failed to write {:?} frame: {e}", frame.opcode),
        location: ErrorLocation::from(Location::caller()),
    })?;

    writer.flush().await.map_err(|e| IpcError::Send {
        message: format!("Failed to flush {:?} frame: {e}", frame.opcode),
        location: ErrorLocation::from(Location::caller()),
    })
}

pub async fn read_frame<R>(reader: &mut R) -> Result<IpcFrame, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(|e| IpcError::Read {
        message: format!("Failed to read frame header: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (opcode, length) = parse_header(header)?;

    let mut body = vec![0u8; length as usize];
    reader.read_exact(&mut body).await.map_err(|e| IpcError::Read {
        message: format!("Failed to read {length}-byte frame body: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(IpcFrame {
        opcode,
        payload: serde_json::from_slice(&body)?,
    })
}

/// Read one frame without interpreting it.
///
/// # Errors
///
/// [`IpcError::Read`] if the stream fails or ends, [`IpcError::Decode`] if the
/// declared length exceeds [`MAX_PAYLOAD_LEN`].
pub async fn read_raw_frame<R>(reader: &mut R) -> Result<RawFrame, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(|e| IpcError::Read {
        message: format!("Failed to read reply header: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (opcode, length) = split_header(header)?;

    let mut body = vec![0u8; length as usize];
    reader.read_exact(&mut body).await.map_err(|e| IpcError::Read {
        message: format!("Failed to read {length}-byte reply body: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok(RawFrame { opcode, body })
}
