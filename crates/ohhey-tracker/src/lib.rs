//! Oh-Hey Tracker - Keeps the local user's presence fresh
//!
//! This crate provides:
//! - The `PositionSensor` interface over the platform location service
//! - `PositionTracker`, which owns the local fix, republishes it on every
//!   update, and drives a resolve cycle after each publish

pub mod sensor;
pub mod tracker;

pub use sensor::*;
pub use tracker::*;
