//! Oh-Hey Test Harness - Simulation and end-to-end validation
//!
//! This crate provides:
//! - A scripted location sensor
//! - A fault-injecting, counting store wrapper
//! - A scenario builder placing peers by meters from an anchor
//! - End-to-end tests of the full presence loop

pub mod sensor;
pub mod store;
pub mod scenario;
pub mod integration;

pub use sensor::*;
pub use store::*;
pub use scenario::*;
pub use integration::*;
