use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IpcError {
    #[error("Channel Not Found Error: {message} {location}")]
    ChannelNotFound {
        message: String,
        location: ErrorLocation,
    },

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

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("Frame Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Frame Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for IpcError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        IpcError::Read {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for IpcError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        IpcError::Decode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
