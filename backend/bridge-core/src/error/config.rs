use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config Missing Error: {reason} {location}")]
    Missing {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Config Read Error: {source} {location}")]
    Read {
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Config Parse Error: {reason} {location}")]
    Parse {
        location: ErrorLocation,
        reason: String,
    },

    #[error("Config Validation Error: {reason} {location}")]
    Validation {
        location: ErrorLocation,
        reason: String,
    },
}

impl From<serde_json::Error> for ConfigError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Parse {
            location: ErrorLocation::from(Location::caller()),
            reason: error.to_string(),
        }
    }
}
