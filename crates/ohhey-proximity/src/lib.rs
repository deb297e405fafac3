//! Oh-Hey Proximity - Who is near the local user right now
//!
//! This crate implements the resolution side of the presence loop:
//! - Distance filtering of a full presence snapshot
//! - Last-write-wins dedup and malformed-record skipping
//! - Synchronous fan-out of the nearby set to subscribers
//! - A consumer-side roster that diffs successive nearby sets

pub mod resolver;
pub mod roster;

pub use resolver::*;
pub use roster::*;
