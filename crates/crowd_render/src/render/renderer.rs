//! Instanced renderer orchestration
//!
//! Driven externally: the animation driver calls [`InstancedRenderer::tick`]
//! once per clip per frame with the baked mesh, material, and shared
//! property block. Each tick resolves the cache entry, optionally runs the
//! steering pass, re-uploads transforms, and issues one draw per sub-mesh
//! through the configured [`DrawBackend`].

use std::sync::Arc;

use thiserror::Error;

use crate::config::CrowdSettings;
use crate::foundation::math::{Transform, Vec3};
use crate::render::cache::{
    InstanceBufferCache, InstanceGridSpec, InstanceKey, TimeOffsetTable,
};
use crate::render::gpu::{DrawBackend, DrawIndexedIndirectArgs, GpuDevice, GpuError};
use crate::render::primitives::{Camera, Material, Mesh, PropertyBlock};
use crate::steering::{FlockParams, FlockUpdater};

/// Hardware ceiling on instances in a single direct (non-indirect) draw
///
/// The direct path clamps to this and logs; it does not split the draw.
pub const MAX_INSTANCES_PER_DRAW: usize = 1023;

/// Property-block binding carrying the instance transform buffer
pub const INSTANCE_TRANSFORMS_BINDING: &str = "instance_transforms";

/// Property-block parameter carrying the per-instance time offsets
pub const INSTANCE_TIME_OFFSETS_BINDING: &str = "instance_time_offsets";

/// Errors surfaced by a tick
#[derive(Error, Debug)]
pub enum RenderError {
    /// A GPU allocation, upload, or submission failed
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Read-only per-frame diagnostics
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    /// Instances resolved by the most recent tick's entry
    pub instance_count: usize,

    /// Mesh vertices times instances for the most recent tick
    pub vertex_count: usize,

    /// Draw calls issued since the last `begin_frame`
    pub draw_calls: usize,
}

/// Renders a grid of animated mesh instances with optional target steering
pub struct InstancedRenderer {
    device: Arc<dyn GpuDevice>,
    cache: InstanceBufferCache,
    grid: InstanceGridSpec,
    params: FlockParams,
    updater: FlockUpdater,
    target: Option<Vec3>,
    use_indirect: bool,
    anchor: Transform,
    last_anchor: Option<Transform>,
    time_offsets: Option<TimeOffsetTable>,
    stats: RenderStats,
}

impl InstancedRenderer {
    /// Create a renderer allocating GPU resources through `device`
    #[must_use]
    pub fn new(device: Arc<dyn GpuDevice>, settings: &CrowdSettings) -> Self {
        log::info!(
            "creating instanced renderer: {}x{} grid, {:?}, indirect={}",
            settings.grid.count_x,
            settings.grid.count_y,
            settings.grid.clip_filter,
            settings.use_indirect
        );
        Self {
            cache: InstanceBufferCache::new(Arc::clone(&device)),
            device,
            grid: settings.grid.clone(),
            params: settings.flock.clone(),
            updater: FlockUpdater::with_seed(settings.rng_seed),
            target: None,
            use_indirect: settings.use_indirect,
            anchor: Transform::identity(),
            last_anchor: None,
            time_offsets: None,
            stats: RenderStats::default(),
        }
    }

    /// Set the steering target; instances herd toward it every tick
    pub fn set_target(&mut self, target: Vec3) {
        self.target = Some(target);
    }

    /// Remove the steering target, freezing instances in place
    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Move the grid's world anchor
    ///
    /// Any change re-anchors every cached entry: the whole cache is
    /// invalidated on the next tick and rebuilt against the new transform.
    pub fn set_anchor(&mut self, anchor: Transform) {
        self.anchor = anchor;
    }

    /// Current world anchor
    #[must_use]
    pub fn anchor(&self) -> &Transform {
        &self.anchor
    }

    /// Current diagnostics
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Reset per-frame counters; call once at the top of each frame
    pub fn begin_frame(&mut self) {
        self.stats = RenderStats::default();
    }

    /// Host signal: the component was disabled; release GPU memory
    pub fn on_disabled(&mut self) {
        log::debug!("renderer disabled, disposing instance buffers");
        self.cache.invalidate_all();
    }

    /// Host signal: this object is being edited; release GPU memory rather
    /// than holding it while selected
    pub fn notify_editing_started(&mut self) {
        log::debug!("editing started, disposing instance buffers");
        self.cache.invalidate_all();
    }

    /// Render one clip for the current frame
    ///
    /// No-op when the grid filters on a different clip. `delta_time` feeds
    /// both the steering step and the orientation smoothing.
    ///
    /// # Errors
    ///
    /// Fails if a GPU allocation, upload, or draw submission is rejected;
    /// cache state stays consistent and the next tick retries from scratch.
    pub fn tick(
        &mut self,
        camera: &Camera,
        mesh: &Mesh,
        material: &mut Material,
        block: &mut PropertyBlock,
        clip_index: u32,
        clips_count: u32,
        delta_time: f32,
        backend: &mut dyn DrawBackend,
    ) -> Result<(), RenderError> {
        if !self.grid.clip_filter.accepts(clip_index) {
            return Ok(());
        }

        // Any anchor movement forces every entry to re-anchor.
        if self.last_anchor.as_ref() != Some(&self.anchor) {
            if self.last_anchor.is_some() {
                log::debug!("anchor transform changed, invalidating instance buffers");
                self.cache.invalidate_all();
            }
            self.last_anchor = Some(self.anchor.clone());
        }

        let key = InstanceKey::new(mesh.id(), clip_index);
        let device = Arc::clone(&self.device);
        let entry = self.cache.ensure(key, &self.grid, clips_count, &self.anchor)?;

        self.stats.instance_count = entry.instance_count();
        self.stats.vertex_count = mesh.vertex_count() as usize * entry.instance_count();

        if let Some(target) = self.target {
            self.updater.update(
                entry.transforms_mut(),
                target,
                &self.params,
                delta_time,
                delta_time,
            );
        }

        if self.use_indirect {
            entry.upload()?;
            block.set_buffer(INSTANCE_TRANSFORMS_BINDING, entry.buffer_id());
        }

        let offsets = self
            .time_offsets
            .get_or_insert_with(|| TimeOffsetTable::generate(&mut rand::thread_rng()));
        block.set_float_array(INSTANCE_TIME_OFFSETS_BINDING, offsets.values());

        for (submesh, sub) in mesh.submeshes().iter().enumerate() {
            if self.use_indirect {
                let args = DrawIndexedIndirectArgs {
                    index_count: sub.index_count,
                    instance_count: entry.instance_count() as u32,
                    first_index: sub.index_start,
                    base_vertex: sub.base_vertex,
                    base_instance: 0,
                };
                let args_id = entry.write_args(device.as_ref(), submesh, args)?;
                backend.draw_indexed_indirect(camera, mesh, submesh, material, block, args_id)?;
            } else {
                if !material.instancing_enabled() {
                    log::error!(
                        "instancing is disabled on assigned material '{}'; enabling it",
                        material.name()
                    );
                    material.enable_instancing();
                }
                let count = entry.instance_count().min(MAX_INSTANCES_PER_DRAW);
                if count < entry.instance_count() {
                    log::warn!(
                        "direct draw clamped to {count} of {} instances",
                        entry.instance_count()
                    );
                }
                backend.draw_instanced(
                    camera,
                    mesh,
                    submesh,
                    material,
                    block,
                    &entry.transforms()[..count],
                )?;
            }
            self.stats.draw_calls += 1;
        }

        log::trace!(
            "tick clip {clip_index}/{clips_count}: {} instances, {} draws so far",
            self.stats.instance_count,
            self.stats.draw_calls
        );
        Ok(())
    }
}

impl Drop for InstancedRenderer {
    fn drop(&mut self) {
        self.cache.invalidate_all();
    }
}
