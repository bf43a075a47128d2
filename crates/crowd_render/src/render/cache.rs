//! Instance buffer cache keyed by (mesh, clip)
//!
//! Owns, per key, a GPU transform buffer plus its CPU mirror and the
//! per-sub-mesh indirect argument buffers. Entries are created lazily on
//! first render, recreated whole whenever the required instance count or
//! buffer validity changes, and disposed together on any global
//! invalidation trigger. Entries are never resized in place.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Mat4Ext, Quat, Transform, Vec2, Vec3};
use crate::render::gpu::{
    BufferId, BufferKind, DrawIndexedIndirectArgs, GpuBuffer, GpuDevice, GpuError,
    INDIRECT_ARGS_LEN,
};
use crate::render::primitives::MeshId;

/// Bytes per instance transform (4x4 f32, column-major)
pub const MATRIX_STRIDE: usize = 16 * std::mem::size_of::<f32>();

/// Entries in the shared time-offset table
pub const TIME_OFFSET_COUNT: usize = 100;

/// Cache key: source mesh identity plus clip index
///
/// Mesh ids come from a process-global counter, so keys never collide
/// across distinct meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    /// Source mesh identity
    pub mesh: MeshId,
    /// Animation clip index
    pub clip: u32,
}

impl InstanceKey {
    /// Build a key for a (mesh, clip) pairing
    #[must_use]
    pub fn new(mesh: MeshId, clip: u32) -> Self {
        Self { mesh, clip }
    }
}

/// Which clips an instance grid renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipFilter {
    /// Lay every clip out side by side, one lane per clip
    All,
    /// Render only when this exact clip is active
    Only(u32),
}

impl ClipFilter {
    /// Whether an invocation for `clip` should render
    #[must_use]
    pub fn accepts(self, clip: u32) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => only == clip,
        }
    }
}

/// Immutable-per-frame grid configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceGridSpec {
    /// Instances along the local X axis
    pub count_x: u32,

    /// Instances along the local Z axis
    pub count_y: u32,

    /// Per-axis spacing between neighboring instances
    pub offset: Vec2,

    /// Clip selection for this grid
    pub clip_filter: ClipFilter,
}

impl Default for InstanceGridSpec {
    fn default() -> Self {
        Self {
            count_x: 10,
            count_y: 10,
            offset: Vec2::new(1.0, 1.0),
            clip_filter: ClipFilter::All,
        }
    }
}

impl InstanceGridSpec {
    /// Instances an entry for this spec must hold
    ///
    /// `count_x * count_y` per clip lane; with [`ClipFilter::All`] every
    /// clip gets a lane in the same entry.
    #[must_use]
    pub fn instance_count(&self, clips_count: u32) -> usize {
        let per_lane = self.count_x as usize * self.count_y as usize;
        match self.clip_filter {
            ClipFilter::All => per_lane * clips_count as usize,
            ClipFilter::Only(_) => per_lane,
        }
    }

    /// Lay out the initial instance transforms
    ///
    /// A regular grid in the local XZ plane. In all-clips mode the x stride
    /// widens to `offset.x * clips_count` and each clip's lane shifts by its
    /// clip index, packing the lanes side by side. The anchor contributes
    /// position and scale; initial rotation is identity.
    #[must_use]
    pub fn layout(&self, clips_count: u32, anchor: &Transform) -> Vec<Mat4> {
        let (lanes, stride_x) = match self.clip_filter {
            ClipFilter::All => (clips_count, self.offset.x * clips_count as f32),
            ClipFilter::Only(_) => (1, self.offset.x),
        };

        let mut transforms = Vec::with_capacity(self.instance_count(clips_count));
        for lane in 0..lanes {
            let lane_shift = match self.clip_filter {
                ClipFilter::All => lane as f32,
                ClipFilter::Only(_) => 0.0,
            };
            for x in 0..self.count_x {
                let ox = x as f32 * stride_x + lane_shift;
                for y in 0..self.count_y {
                    let local = Vec3::new(ox, 0.0, y as f32 * self.offset.y);
                    transforms.push(Mat4::from_trs(
                        local + anchor.position,
                        Quat::identity(),
                        anchor.scale,
                    ));
                }
            }
        }
        transforms
    }
}

/// Per-instance animation phase offsets
///
/// Fixed at [`TIME_OFFSET_COUNT`] entries, generated once and shared across
/// every cache entry for the lifetime of the owning renderer; never resized
/// or regenerated.
#[derive(Debug, Clone)]
pub struct TimeOffsetTable {
    values: [f32; TIME_OFFSET_COUNT],
}

impl TimeOffsetTable {
    /// Generate the table from a random source, offsets in `[0, 100)`
    #[must_use]
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut values = [0.0; TIME_OFFSET_COUNT];
        for value in &mut values {
            *value = rng.gen::<f32>() * 100.0;
        }
        Self { values }
    }

    /// The offset values
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// One cache entry: CPU transform mirror, GPU buffer, and args buffers
///
/// The CPU mirror feeds both the steering pass and the direct draw path;
/// after any mutation it must be re-uploaded before a draw observes the GPU
/// buffer.
pub struct InstanceBufferEntry {
    transforms: Vec<Mat4>,
    buffer: Box<dyn GpuBuffer>,
    args: Vec<Box<dyn GpuBuffer>>,
}

impl InstanceBufferEntry {
    fn create(device: &dyn GpuDevice, transforms: Vec<Mat4>) -> Result<Self, GpuError> {
        let mut buffer =
            device.create_buffer(transforms.len(), MATRIX_STRIDE, BufferKind::Structured)?;
        buffer.upload(&matrix_bytes(&transforms))?;
        Ok(Self {
            transforms,
            buffer,
            args: Vec::new(),
        })
    }

    /// Number of instances this entry holds
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.transforms.len()
    }

    /// Read access to the CPU transform mirror
    #[must_use]
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Mutable access to the CPU transform mirror
    ///
    /// Callers must [`upload`](Self::upload) before the next indirect draw.
    pub fn transforms_mut(&mut self) -> &mut [Mat4] {
        &mut self.transforms
    }

    /// Push the CPU mirror into the GPU buffer
    ///
    /// # Errors
    ///
    /// Fails if the GPU buffer was disposed or shrank underneath us.
    pub fn upload(&mut self) -> Result<(), GpuError> {
        self.buffer.upload(&matrix_bytes(&self.transforms))
    }

    /// Identity of the GPU transform buffer
    #[must_use]
    pub fn buffer_id(&self) -> BufferId {
        self.buffer.id()
    }

    /// Whether the GPU transform buffer is still usable
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.buffer.is_valid()
    }

    /// Refresh the args buffer for `submesh`, creating it on first use
    ///
    /// # Errors
    ///
    /// Fails if allocation or upload is rejected by the device.
    pub fn write_args(
        &mut self,
        device: &dyn GpuDevice,
        submesh: usize,
        args: DrawIndexedIndirectArgs,
    ) -> Result<BufferId, GpuError> {
        while self.args.len() <= submesh {
            self.args.push(device.create_buffer(
                INDIRECT_ARGS_LEN,
                std::mem::size_of::<u32>(),
                BufferKind::IndirectArgs,
            )?);
        }
        let buffer = &mut self.args[submesh];
        buffer.upload(bytemuck::bytes_of(&args))?;
        Ok(buffer.id())
    }

    /// Release every GPU resource owned by the entry
    ///
    /// Idempotent, and safe on partially constructed entries (an entry with
    /// no args buffers yet).
    pub fn dispose(&mut self) {
        self.buffer.dispose();
        for args in &mut self.args {
            args.dispose();
        }
    }
}

impl Drop for InstanceBufferEntry {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn matrix_bytes(transforms: &[Mat4]) -> Vec<u8> {
    let mut floats: Vec<f32> = Vec::with_capacity(transforms.len() * 16);
    for m in transforms {
        floats.extend_from_slice(m.as_slice());
    }
    bytemuck::cast_slice(&floats).to_vec()
}

/// Lazily populated cache of instance buffer entries
pub struct InstanceBufferCache {
    device: Arc<dyn GpuDevice>,
    entries: HashMap<InstanceKey, InstanceBufferEntry>,
}

impl InstanceBufferCache {
    /// Create an empty cache allocating through `device`
    #[must_use]
    pub fn new(device: Arc<dyn GpuDevice>) -> Self {
        Self {
            device,
            entries: HashMap::new(),
        }
    }

    /// Resolve the entry for `key`, creating or recreating it as needed
    ///
    /// First call for a key lays out the grid, uploads, and records the
    /// entry. Later calls recreate it only when the required instance count
    /// changed or the GPU buffer went invalid; otherwise the existing entry
    /// comes back untouched.
    ///
    /// # Errors
    ///
    /// Fails if the device rejects an allocation or upload.
    pub fn ensure(
        &mut self,
        key: InstanceKey,
        spec: &InstanceGridSpec,
        clips_count: u32,
        anchor: &Transform,
    ) -> Result<&mut InstanceBufferEntry, GpuError> {
        let required = spec.instance_count(clips_count);
        match self.entries.entry(key) {
            Entry::Occupied(occupied)
                if occupied.get().instance_count() == required && occupied.get().is_valid() =>
            {
                Ok(occupied.into_mut())
            }
            Entry::Occupied(mut occupied) => {
                log::debug!(
                    "recreating instance buffer for {key:?}: {} -> {required} instances",
                    occupied.get().instance_count()
                );
                occupied.get_mut().dispose();
                let fresh =
                    InstanceBufferEntry::create(self.device.as_ref(), spec.layout(clips_count, anchor))?;
                *occupied.get_mut() = fresh;
                Ok(occupied.into_mut())
            }
            Entry::Vacant(vacant) => {
                log::debug!("creating instance buffer for {key:?}: {required} instances");
                let fresh =
                    InstanceBufferEntry::create(self.device.as_ref(), spec.layout(clips_count, anchor))?;
                Ok(vacant.insert(fresh))
            }
        }
    }

    /// Look up an entry without creating it
    #[must_use]
    pub fn get(&self, key: InstanceKey) -> Option<&InstanceBufferEntry> {
        self.entries.get(&key)
    }

    /// Number of live entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispose every entry and clear the cache
    ///
    /// All entries go together; there is no per-entry invalidation. Safe to
    /// call with no entries and safe to call repeatedly.
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("disposing {} instance buffer entries", self.entries.len());
        }
        for entry in self.entries.values_mut() {
            entry.dispose();
        }
        self.entries.clear();
    }
}

impl Drop for InstanceBufferCache {
    fn drop(&mut self) {
        self.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessDevice;
    use crate::render::primitives::Mesh;
    use approx::assert_relative_eq;

    fn spec(count_x: u32, count_y: u32, filter: ClipFilter) -> InstanceGridSpec {
        InstanceGridSpec {
            count_x,
            count_y,
            offset: Vec2::new(1.0, 1.0),
            clip_filter: filter,
        }
    }

    #[test]
    fn entry_count_matches_grid_spec() {
        let device = Arc::new(HeadlessDevice::new());
        let mut cache = InstanceBufferCache::new(device);
        let mesh = Mesh::single_submesh("crowd", 8, 36);
        let anchor = Transform::identity();

        let all = cache
            .ensure(InstanceKey::new(mesh.id(), 0), &spec(4, 3, ClipFilter::All), 5, &anchor)
            .unwrap();
        assert_eq!(all.instance_count(), 4 * 3 * 5);

        let only = cache
            .ensure(
                InstanceKey::new(mesh.id(), 1),
                &spec(4, 3, ClipFilter::Only(1)),
                5,
                &anchor,
            )
            .unwrap();
        assert_eq!(only.instance_count(), 4 * 3);
    }

    #[test]
    fn zero_instances_is_degenerate_but_valid() {
        let device = Arc::new(HeadlessDevice::new());
        let mut cache = InstanceBufferCache::new(device);
        let mesh = Mesh::single_submesh("crowd", 8, 36);
        let entry = cache
            .ensure(
                InstanceKey::new(mesh.id(), 0),
                &spec(0, 7, ClipFilter::All),
                2,
                &Transform::identity(),
            )
            .unwrap();
        assert_eq!(entry.instance_count(), 0);
        assert!(entry.is_valid());
    }

    #[test]
    fn ensure_reuses_entry() {
        let device = Arc::new(HeadlessDevice::new());
        let mut cache = InstanceBufferCache::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let mesh = Mesh::single_submesh("crowd", 8, 36);
        let key = InstanceKey::new(mesh.id(), 0);
        let grid = spec(4, 4, ClipFilter::All);
        let anchor = Transform::identity();

        let first_id = cache.ensure(key, &grid, 2, &anchor).unwrap().buffer_id();
        let allocations = device.total_allocations();

        let second_id = cache.ensure(key, &grid, 2, &anchor).unwrap().buffer_id();
        assert_eq!(first_id, second_id);
        assert_eq!(device.total_allocations(), allocations);
    }

    #[test]
    fn count_change_recreates_entry() {
        let device = Arc::new(HeadlessDevice::new());
        let mut cache = InstanceBufferCache::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let mesh = Mesh::single_submesh("crowd", 8, 36);
        let key = InstanceKey::new(mesh.id(), 0);
        let anchor = Transform::identity();

        let first_id = cache
            .ensure(key, &spec(4, 4, ClipFilter::All), 2, &anchor)
            .unwrap()
            .buffer_id();
        let entry = cache
            .ensure(key, &spec(8, 4, ClipFilter::All), 2, &anchor)
            .unwrap();
        assert_ne!(entry.buffer_id(), first_id);
        assert_eq!(entry.instance_count(), 8 * 4 * 2);
        // Old buffer was disposed along the way.
        assert_eq!(device.live_allocations(), 1);
    }

    #[test]
    fn ensure_after_dispose_recreates() {
        let device = Arc::new(HeadlessDevice::new());
        let mut cache = InstanceBufferCache::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let mesh = Mesh::single_submesh("crowd", 8, 36);
        let key = InstanceKey::new(mesh.id(), 0);
        let grid = spec(2, 2, ClipFilter::Only(0));
        let anchor = Transform::identity();

        cache.ensure(key, &grid, 1, &anchor).unwrap();
        let allocations = device.total_allocations();

        cache.invalidate_all();
        cache.invalidate_all(); // repeated invalidation is safe
        assert!(cache.is_empty());
        assert_eq!(device.live_allocations(), 0);

        let entry = cache.ensure(key, &grid, 1, &anchor).unwrap();
        assert!(entry.is_valid());
        assert!(device.total_allocations() > allocations);
    }

    #[test]
    fn invalid_buffer_recreates_in_place() {
        let device = Arc::new(HeadlessDevice::new());
        let mut cache = InstanceBufferCache::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let mesh = Mesh::single_submesh("crowd", 8, 36);
        let key = InstanceKey::new(mesh.id(), 0);
        let grid = spec(2, 2, ClipFilter::Only(0));
        let anchor = Transform::identity();

        let first_id = cache.ensure(key, &grid, 1, &anchor).unwrap().buffer_id();

        // Dispose the buffer without removing the entry: the count still
        // matches, so only the validity check can force the rebuild.
        cache.ensure(key, &grid, 1, &anchor).unwrap().dispose();
        assert_eq!(cache.len(), 1);
        assert_eq!(device.live_allocations(), 0);

        let entry = cache.ensure(key, &grid, 1, &anchor).unwrap();
        assert!(entry.is_valid());
        assert_ne!(entry.buffer_id(), first_id);
        assert_eq!(cache.len(), 1);
        assert_eq!(device.live_allocations(), 1);
    }

    #[test]
    fn layout_packs_clip_lanes_side_by_side() {
        let grid = InstanceGridSpec {
            count_x: 2,
            count_y: 2,
            offset: Vec2::new(3.0, 2.0),
            clip_filter: ClipFilter::All,
        };
        let transforms = grid.layout(2, &Transform::identity());
        assert_eq!(transforms.len(), 8);

        // Lane 0, x=0..2: x stride is offset.x * clips = 6.
        assert_relative_eq!(transforms[0].translation(), Vec3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(transforms[1].translation(), Vec3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(transforms[2].translation(), Vec3::new(6.0, 0.0, 0.0));
        // Lane 1 shifts by its clip index.
        assert_relative_eq!(transforms[4].translation(), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(transforms[6].translation(), Vec3::new(7.0, 0.0, 0.0));
    }

    #[test]
    fn layout_applies_anchor_position_and_scale() {
        let grid = spec(1, 1, ClipFilter::Only(3));
        let anchor = Transform {
            position: Vec3::new(10.0, 1.0, -5.0),
            rotation: Quat::identity(),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let transforms = grid.layout(4, &anchor);
        assert_eq!(transforms.len(), 1);
        assert_relative_eq!(transforms[0].translation(), Vec3::new(10.0, 1.0, -5.0));
        assert_relative_eq!(transforms[0][(0, 0)], 2.0);
    }

    #[test]
    fn write_args_reuses_per_submesh_buffer() {
        let device = Arc::new(HeadlessDevice::new());
        let mut cache = InstanceBufferCache::new(Arc::clone(&device) as Arc<dyn GpuDevice>);
        let mesh = Mesh::single_submesh("crowd", 8, 36);
        let key = InstanceKey::new(mesh.id(), 0);
        let grid = spec(2, 2, ClipFilter::Only(0));
        let anchor = Transform::identity();

        let entry = cache.ensure(key, &grid, 1, &anchor).unwrap();
        let args = DrawIndexedIndirectArgs {
            index_count: 36,
            instance_count: 4,
            first_index: 0,
            base_vertex: 0,
            base_instance: 0,
        };
        let inner = HeadlessDevice::new();
        let first = entry.write_args(&inner, 0, args).unwrap();
        // Second write reuses the buffer.
        let second = entry.write_args(&inner, 0, args).unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.total_allocations(), 1);
    }

    #[test]
    fn time_offset_table_has_fixed_size_and_range() {
        let mut rng = rand::thread_rng();
        let table = TimeOffsetTable::generate(&mut rng);
        assert_eq!(table.values().len(), TIME_OFFSET_COUNT);
        assert!(table.values().iter().all(|v| (0.0..100.0).contains(v)));
    }
}
