//! # Crowd Render
//!
//! Instanced rendering of large mesh grids driven by baked animation clips,
//! with a lightweight separation-based steering pass that herds every
//! instance toward a moving target.
//!
//! ## Architecture
//!
//! - [`steering`]: pure steering math and the per-frame flock update that
//!   rewrites instance transforms in place.
//! - [`render`]: the GPU-visible side: instance buffer cache keyed by
//!   (mesh, clip), capability traits for GPU buffers and draw submission,
//!   and the orchestrating [`render::InstancedRenderer`].
//! - [`foundation`]: math aliases, transforms, and frame timing shared by
//!   the other modules.
//! - [`config`]: serializable settings for the grid, steering tunables, and
//!   the draw path.
//!
//! The renderer is driven externally: an animation driver calls
//! [`render::InstancedRenderer::tick`] once per clip per frame, supplying
//! the baked mesh, material, and shared property block. No event loop is
//! owned by this crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crowd_render::prelude::*;
//! use crowd_render::render::backends::headless::{HeadlessDevice, RecordingBackend};
//!
//! let device = Arc::new(HeadlessDevice::new());
//! let settings = CrowdSettings::default();
//! let mut renderer = InstancedRenderer::new(device, &settings);
//! renderer.set_target(Vec3::new(0.0, 0.0, 20.0));
//!
//! let mesh = Mesh::single_submesh("walker", 1024, 2048);
//! let mut material = Material::new("walker_mat");
//! let mut block = PropertyBlock::default();
//! let camera = Camera::default();
//! let mut backend = RecordingBackend::default();
//!
//! // One invocation per clip per frame, as the animation driver supplies them.
//! for clip in 0..4 {
//!     renderer
//!         .tick(&camera, &mesh, &mut material, &mut block, clip, 4, 1.0 / 60.0, &mut backend)
//!         .unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod steering;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        config::CrowdSettings,
        foundation::{
            math::{Mat4, Quat, Transform, Vec2, Vec3},
            time::FrameTimer,
        },
        render::{
            cache::{ClipFilter, InstanceBufferCache, InstanceGridSpec, InstanceKey},
            gpu::{DrawBackend, GpuBuffer, GpuDevice},
            primitives::{Camera, Material, Mesh, PropertyBlock},
            renderer::{InstancedRenderer, RenderStats},
        },
        steering::{FlockParams, FlockUpdater},
    };
}
