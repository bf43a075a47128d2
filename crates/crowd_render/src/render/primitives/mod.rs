//! Driver-facing render primitives
//!
//! The animation driver owns the baked mesh, material, and shared property
//! block; these types are the surfaces this crate consumes per tick. They
//! carry only the data the cache and the draw backends read: geometry
//! ranges, the instancing flag, and named shader parameters.

pub mod camera;
pub mod material;
pub mod mesh;

pub use camera::Camera;
pub use material::{Material, PropertyBlock};
pub use mesh::{Mesh, MeshId, SubMesh};
