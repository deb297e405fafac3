//! Oh-Hey Runtime - Client orchestration
//!
//! This crate wires the presence loop together:
//! 1. Load `ClientConfig`
//! 2. Install logging
//! 3. Acquire the initial fix and publish it
//! 4. Track continuously, republishing on every update
//! 5. Resolve the nearby set after each publish and fan it out

pub mod config;
pub mod logging;
pub mod client;

pub use config::*;
pub use logging::*;
pub use client::*;
