//! Oh-Hey Presence - The shared `userId -> presence` mapping
//!
//! This crate provides:
//! - The `PresenceStore` interface the tracker writes through
//! - An in-process backend with per-connection auto-remove on disconnect

pub mod store;
pub mod memory;

pub use store::*;
pub use memory::*;
