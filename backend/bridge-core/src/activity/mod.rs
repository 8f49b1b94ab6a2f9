//! Presence normalization and change suppression.
//!
//! Raw `discord:update` fields ([`ActivityUpdate`]) are normalized into an
//! [`ActivityDescriptor`] with defaults applied, then handed to the
//! [`ActivityStateManager`], which only talks to Discord when the
//! descriptor's [`DedupKey`] differs from the last one sent.

pub mod descriptor;
mod manager;
pub mod update;

pub use descriptor::{ActivityDescriptor, DedupKey, build_descriptor, resolve_large_image};
pub use manager::ActivityStateManager;
pub use update::ActivityUpdate;
