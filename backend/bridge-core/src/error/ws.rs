use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum WsError {
    #[error("Connection Error: {message} {location}")]
    Connection {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Peer Closed: {message} {location}")]
    PeerClosed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for WsError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => WsError::PeerClosed {
                message: format!("Stream ended mid-frame: {error}"),
                location,
            },
            _ => WsError::Io {
                message: error.to_string(),
                location,
            },
        }
    }
}

impl From<serde_json::Error> for WsError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        WsError::Decode {
            message: format!("Invalid event envelope: {error}"),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
