//! Oh-Hey Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every Oh-Hey component:
//! - Identifiers (UserId, SubscriptionId, WatchId)
//! - Timestamps (server and sensor clocks)
//! - Geographic positions and presence records
//! - Derived nearby-set and scene types
//! - Error types

pub mod id;
pub mod time;
pub mod position;
pub mod presence;
pub mod error;

pub use id::*;
pub use time::*;
pub use position::*;
pub use presence::*;
pub use error::*;
