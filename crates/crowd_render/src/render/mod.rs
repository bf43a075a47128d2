//! # Instanced Rendering System
//!
//! The GPU-visible half of the crate. The pieces, leaf first:
//!
//! - [`gpu`]: capability traits for GPU buffers ([`gpu::GpuDevice`],
//!   [`gpu::GpuBuffer`]) and draw submission ([`gpu::DrawBackend`]). The
//!   actual graphics-API command issuance lives behind these traits; the
//!   core never talks to a graphics API directly.
//! - [`backends`]: backend implementations. The in-tree [`backends::headless`]
//!   backend stores buffers CPU-side and records draws, serving tests,
//!   diagnostics, and the demo driver.
//! - [`primitives`]: the driver-facing mesh/material/camera/property-block
//!   types consumed per tick.
//! - [`cache`]: the instance buffer cache keyed by (mesh, clip): lazy
//!   creation, invalidation on topology change, deterministic disposal.
//! - [`renderer`]: the orchestrating [`renderer::InstancedRenderer`] that an
//!   animation driver ticks once per clip per frame.

pub mod backends;
pub mod cache;
pub mod gpu;
pub mod primitives;
pub mod renderer;

pub use cache::{InstanceBufferCache, InstanceGridSpec, InstanceKey};
pub use gpu::{DrawBackend, GpuBuffer, GpuDevice, GpuError};
pub use primitives::{Camera, Material, Mesh, PropertyBlock};
pub use renderer::{InstancedRenderer, RenderStats};
