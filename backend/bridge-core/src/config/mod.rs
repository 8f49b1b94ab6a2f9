//! Startup configuration and runtime tunables.
//!
//! The host writes exactly one JSON line to the bridge's stdin:
//!
//! ```json
//! {"nlPort": 53421, "nlExtensionId": "js.neutralino.discordrpc", "nlConnectToken": "..."}
//! ```
//!
//! That line becomes a [`StartupConfig`] and is never re-read. Everything
//! else the bridge needs (timeouts, client id, presence defaults) lives in
//! [`BridgeOptions`].

pub mod options;

pub use options::{BridgeOptions, PresenceDefaults};

use crate::error::config::ConfigError;

use common::{ErrorLocation, RedactedToken};

use std::io::BufRead;
use std::panic::Location;

use log::debug;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct StartupConfig {
    /// Hosts write this as a number or as a numeric string.
    #[serde(rename = "nlPort", deserialize_with = "lenient_port")]
    pub port: u16,

    #[serde(rename = "nlExtensionId")]
    pub extension_id: String,

    #[serde(rename = "nlConnectToken")]
    pub connect_token: RedactedToken,
}

impl StartupConfig {
    /// Parse a single config line.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] if the line is blank
    /// - [`ConfigError::Parse`] if it is not the expected JSON object
    /// - [`ConfigError::Validation`] if the port is zero or the extension id is empty
    #[track_caller]
    pub fn from_line(line: &str) -> Result<Self, ConfigError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ConfigError::Missing {
                location: ErrorLocation::from(Location::caller()),
                reason: "Startup line was empty".to_string(),
            });
        }

        let config: StartupConfig = serde_json::from_str(line)?;
        config.validate()?;

        debug!(
            "Startup config: port={}, extension_id={}, token={}",
            config.port, config.extension_id, config.connect_token
        );
        Ok(config)
    }

    /// Read and parse the first line of `reader` (normally stdin).
    ///
    /// EOF before any byte arrives is reported as [`ConfigError::Missing`].
    #[track_caller]
    pub fn read_from<R: BufRead>(mut reader: R) -> Result<Self, ConfigError> {
        let mut line = String::new();
        let read = reader.read_line(&mut line).map_err(|e| ConfigError::Read {
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })?;

        if read == 0 {
            return Err(ConfigError::Missing {
                location: ErrorLocation::from(Location::caller()),
                reason: "Stdin closed before a config line arrived".to_string(),
            });
        }

        Self::from_line(&line)
    }

    #[track_caller]
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: "nlPort must be non-zero".to_string(),
            });
        }

        if self.extension_id.trim().is_empty() {
            return Err(ConfigError::Validation {
                location: ErrorLocation::from(Location::caller()),
                reason: "nlExtensionId must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

fn lenient_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let number = match &raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    number
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| D::Error::custom(format!("nlPort must be a port number, got {raw}")))
}
