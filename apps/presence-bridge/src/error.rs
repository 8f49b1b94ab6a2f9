use common::ErrorLocation;

use thiserror::Error;

/// Failures of the binary's own setup, outside `bridge-core`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    #[error("Runtime Error: {message} {location}")]
    Runtime {
        message: String,
        location: ErrorLocation,
    },
}
