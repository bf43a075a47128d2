//! Foundation utilities shared across the crate
//!
//! Math aliases and frame timing. These are deliberately thin wrappers over
//! `nalgebra` and `std::time`; steering and rendering code builds on them.

pub mod math;
pub mod time;
