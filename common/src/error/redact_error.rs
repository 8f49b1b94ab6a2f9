use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Refusals from types that guard a secret value.
#[derive(Debug, ThisError)]
pub enum RedactError {
    /// A guarded secret was about to be written into an outbound payload.
    #[error("Token Exposure Error: {message} {location}")]
    Exposure {
        message: String,
        location: ErrorLocation,
    },
}
