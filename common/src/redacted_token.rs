//! Connect-token handling with redacted Debug/Display output.

use crate::{ErrorLocation, RedactError};

use std::fmt;
use std::panic::Location;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as SerError, Serialize, Serializer};
use zeroize::Zeroize;

/// A host-issued secret (e.g. the Neutralino `connectToken`).
///
/// Deserializes from a plain JSON string so it can sit directly inside a
/// config struct, but refuses to serialize and prints as `[REDACTED]`.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedToken {
    inner: String,
}

impl RedactedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    /// Raw value, for putting on the wire only.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedToken([REDACTED; {} bytes])", self.inner.len())
    }
}

impl fmt::Display for RedactedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for RedactedToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl<'de> Deserialize<'de> for RedactedToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(RedactedToken::new)
    }
}

impl Serialize for RedactedToken {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Err(S::Error::custom(RedactError::Exposure {
            message: String::from("refusing to write a connect token into a payload; call expose() where it belongs"),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
