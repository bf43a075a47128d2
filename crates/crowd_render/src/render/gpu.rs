//! GPU resource and draw-submission capability interface
//!
//! Models `ComputeBuffer`-style GPU resources behind a minimal trait pair:
//! a [`GpuDevice`] allocates [`GpuBuffer`]s, and a [`DrawBackend`] turns the
//! cache's output into draw calls. Backend-specific implementations (a real
//! graphics API, or the in-tree headless backend) plug in underneath;
//! nothing in the core depends on a concrete API.

use thiserror::Error;

use crate::foundation::math::Mat4;
use crate::render::primitives::{Camera, Material, Mesh, PropertyBlock};

/// Identifier of a GPU buffer allocation
///
/// Stable for the lifetime of the allocation; also used as the value bound
/// into a [`PropertyBlock`] for shader-visible buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// What a buffer will hold, for backends that care about usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Structured data read by shaders (instance transforms)
    Structured,
    /// Indirect draw argument blocks
    IndirectArgs,
}

/// GPU resource errors
#[derive(Error, Debug)]
pub enum GpuError {
    /// The backend could not allocate a buffer
    #[error("buffer allocation failed: {0}")]
    AllocationFailed(String),

    /// An upload was larger than the buffer it targeted
    #[error("upload of {got} bytes exceeds buffer capacity of {capacity} bytes")]
    UploadOverflow {
        /// Bytes in the rejected upload
        got: usize,
        /// Capacity of the target buffer in bytes
        capacity: usize,
    },

    /// The buffer was disposed or otherwise invalidated
    #[error("buffer {0:?} is no longer valid")]
    InvalidBuffer(BufferId),
}

/// A GPU-visible buffer allocation
///
/// Element count and stride are fixed at creation; resizing is expressed as
/// dispose-and-recreate, never in place. `dispose` must be idempotent.
pub trait GpuBuffer {
    /// Allocation identifier
    fn id(&self) -> BufferId;

    /// Element count the buffer was created with
    fn len(&self) -> usize;

    /// Whether the buffer holds zero elements
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per element
    fn stride(&self) -> usize;

    /// Replace the buffer contents with `bytes`
    ///
    /// # Errors
    ///
    /// Fails if the buffer is no longer valid or `bytes` exceeds its
    /// capacity.
    fn upload(&mut self, bytes: &[u8]) -> Result<(), GpuError>;

    /// Whether the underlying GPU resource is still usable
    fn is_valid(&self) -> bool;

    /// Release the GPU resource; safe to call repeatedly
    fn dispose(&mut self);
}

/// Allocates GPU buffers
///
/// Object-safe so the cache can hold it as `Arc<dyn GpuDevice>`.
pub trait GpuDevice {
    /// Allocate a buffer of `len` elements of `stride` bytes each
    ///
    /// A zero-element buffer is degenerate but valid and must not fail.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot satisfy the allocation.
    fn create_buffer(
        &self,
        len: usize,
        stride: usize,
        kind: BufferKind,
    ) -> Result<Box<dyn GpuBuffer>, GpuError>;
}

/// Argument block for an indexed indirect draw
///
/// Layout matches the GPU-side five-integer convention; uploaded verbatim
/// into an [`BufferKind::IndirectArgs`] buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexedIndirectArgs {
    /// Number of indices in the sub-mesh
    pub index_count: u32,
    /// Number of instances to draw
    pub instance_count: u32,
    /// First index within the index buffer
    pub first_index: u32,
    /// Value added to each index before vertex lookup
    pub base_vertex: u32,
    /// First instance id
    pub base_instance: u32,
}

// Plain u32 fields only, so the Pod contract holds.
unsafe impl bytemuck::Pod for DrawIndexedIndirectArgs {}
unsafe impl bytemuck::Zeroable for DrawIndexedIndirectArgs {}

/// Number of `u32` fields in an indirect args block
pub const INDIRECT_ARGS_LEN: usize = 5;

/// Thin adapter that turns the buffer cache's output into draw calls
///
/// One call per sub-mesh per frame. The indirect path reads its per-call
/// arguments from a GPU-resident args buffer; the direct path receives the
/// CPU-resident transform slice.
pub trait DrawBackend {
    /// Issue an instanced draw whose arguments live in `args`
    ///
    /// # Errors
    ///
    /// Fails if the backend rejects the submission.
    fn draw_indexed_indirect(
        &mut self,
        camera: &Camera,
        mesh: &Mesh,
        submesh: usize,
        material: &Material,
        block: &PropertyBlock,
        args: BufferId,
    ) -> Result<(), GpuError>;

    /// Issue a direct instanced draw from a CPU-resident transform array
    ///
    /// # Errors
    ///
    /// Fails if the backend rejects the submission.
    fn draw_instanced(
        &mut self,
        camera: &Camera,
        mesh: &Mesh,
        submesh: usize,
        material: &Material,
        block: &PropertyBlock,
        transforms: &[Mat4],
    ) -> Result<(), GpuError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indirect_args_layout_is_five_u32() {
        assert_eq!(
            std::mem::size_of::<DrawIndexedIndirectArgs>(),
            INDIRECT_ARGS_LEN * std::mem::size_of::<u32>()
        );
        let args = DrawIndexedIndirectArgs {
            index_count: 36,
            instance_count: 100,
            first_index: 12,
            base_vertex: 8,
            base_instance: 0,
        };
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&args));
        assert_eq!(words, &[36, 100, 12, 8, 0]);
    }
}
