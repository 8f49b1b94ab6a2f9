//! Inbound frame decoding.
//!
//! ```text
//!  byte 0: FIN | RSV1-3 | opcode(4)
//!  byte 1: MASK | len(7)          len 126 -> u16 BE follows, 127 -> u64 BE follows
//!  [mask key: 4 bytes if MASK]
//!  payload
//! ```

use crate::error::ws::WsError;

use common::ErrorLocation;

use std::panic::Location;

use tokio::io::{AsyncRead, AsyncReadExt};

const FIN_BIT: u8 = 0x80;
const RSV_BITS: u8 = 0x70;
const OPCODE_BITS: u8 = 0x0f;
const MASK_BIT: u8 = 0x80;
const LENGTH_BITS: u8 = 0x7f;
const EXTENDED_16_MARKER: u8 = 126;
const EXTENDED_64_MARKER: u8 = 127;
const MAX_CONTROL_PAYLOAD: u64 = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOpcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl FrameOpcode {
    #[track_caller]
    fn from_bits(bits: u8) -> Result<Self, WsError> {
        match bits {
            0x0 => Ok(FrameOpcode::Continuation),
            0x1 => Ok(FrameOpcode::Text),
            0x2 => Ok(FrameOpcode::Binary),
            0x8 => Ok(FrameOpcode::Close),
            0x9 => Ok(FrameOpcode::Ping),
            0xA => Ok(FrameOpcode::Pong),
            other => Err(WsError::Decode {
                message: format!("Reserved opcode {other:#x}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    pub fn is_control(self) -> bool {
        matches!(
            self,
            FrameOpcode::Close | FrameOpcode::Ping | FrameOpcode::Pong
        )
    }
}

/// How the payload length is encoded after the second header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthField {
    /// 0..=125, stored in the header itself.
    Short(u8),
    /// Two big-endian bytes follow.
    Extended16,
    /// Eight big-endian bytes follow.
    Extended64,
}

impl LengthField {
    pub fn from_marker(byte: u8) -> Self {
        match byte & LENGTH_BITS {
            EXTENDED_16_MARKER => LengthField::Extended16,
            EXTENDED_64_MARKER => LengthField::Extended64,
            short => LengthField::Short(short),
        }
    }

    pub fn extra_bytes(self) -> usize {
        match self {
            LengthField::Short(_) => 0,
            LengthField::Extended16 => 2,
            LengthField::Extended64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: FrameOpcode,
    pub masked: bool,
    pub length_field: LengthField,
}

impl FrameHeader {
    /// Decode the two fixed header bytes.
    #[track_caller]
    pub fn parse(bytes: [u8; 2]) -> Result<Self, WsError> {
        if bytes[0] & RSV_BITS != 0 {
            return Err(WsError::Decode {
                message: format!("RSV bits set without a negotiated extension: {:#04x}", bytes[0]),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            fin: bytes[0] & FIN_BIT != 0,
            opcode: FrameOpcode::from_bits(bytes[0] & OPCODE_BITS)?,
            masked: bytes[1] & MASK_BIT != 0,
            length_field: LengthField::from_marker(bytes[1]),
        })
    }
}

/// Read the extended length bytes (if any) the header calls for.
pub async fn read_payload_length<R>(reader: &mut R, field: LengthField) -> Result<u64, WsError>
where
    R: AsyncRead + Unpin,
{
    match field {
        LengthField::Short(len) => Ok(u64::from(len)),
        LengthField::Extended16 => Ok(u64::from(reader.read_u16().await?)),
        LengthField::Extended64 => {
            let len = reader.read_u64().await?;
            if len >> 63 != 0 {
                return Err(WsError::Decode {
                    message: "64-bit payload length has its high bit set".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            Ok(len)
        }
    }
}

/// One decoded frame with its payload already unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsFrame {
    pub fin: bool,
    pub opcode: FrameOpcode,
    pub payload: Vec<u8>,
}

/// Read exactly one frame.
///
/// Servers send unmasked frames; a masked one is unmasked rather than rejected.
///
/// # Errors
///
/// - [`WsError::Decode`] for reserved bits/opcodes, oversized or malformed control frames,
///   and payloads above `max_payload`
/// - [`WsError::PeerClosed`] if the stream ends mid-frame
pub async fn read_frame<R>(reader: &mut R, max_payload: u64) -> Result<WsFrame, WsError>
where
    R: AsyncRead + Unpin,
{
    let mut fixed = [0u8; 2];
    reader.read_exact(&mut fixed).await?;
    let header = FrameHeader::parse(fixed)?;

    let length = read_payload_length(reader, header.length_field).await?;

    if header.opcode.is_control() && (length > MAX_CONTROL_PAYLOAD || !header.fin) {
        return Err(WsError::Decode {
            message: format!(
                "Malformed {:?} control frame (len={length}, fin={})",
                header.opcode, header.fin
            ),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if length > max_payload {
        return Err(WsError::Decode {
            message: format!("Frame payload of {length} bytes exceeds limit of {max_payload}"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mask = if header.masked {
        let mut key = [0u8; 4];
        reader.read_exact(&mut key).await?;
        Some(key)
    } else {
        None
    };

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).await?;

    if let Some(key) = mask {
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % 4];
        }
    }

    Ok(WsFrame {
        fin: header.fin,
        opcode: header.opcode,
        payload,
    })
}
