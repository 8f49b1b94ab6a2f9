//! Shared building blocks for the presence bridge.
//!
//! - [`ErrorLocation`]: call-site capture attached to every error variant
//! - [`RedactedToken`]: secret string that never reaches logs or serializers
//!
//! `bridge-core` and the `presence-bridge` binary both depend on this crate;
//! it has no knowledge of either protocol.

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;
