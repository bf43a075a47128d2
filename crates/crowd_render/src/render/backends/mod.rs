//! GPU backend implementations
//!
//! Backends implement the capability traits in [`crate::render::gpu`].
//! Only the headless backend ships in-tree; a graphics-API backend would
//! live alongside it without changes to the core.

pub mod headless;
