//! Steering behavior for instanced crowds
//!
//! A stylized separation-only heuristic: every instance pursues a shared
//! target point while pushing away from a random sample of neighbors. There
//! is no alignment or cohesion term, so this is not full Reynolds boids.
//!
//! [`math`] holds the stateless numeric routines; [`flock`] applies them
//! across a full instance transform array once per frame.

pub mod flock;
pub mod math;

pub use flock::{FlockParams, FlockUpdater};
