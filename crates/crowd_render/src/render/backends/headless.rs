//! Headless GPU backend
//!
//! Buffers live in CPU memory and draws are recorded instead of issued.
//! This is the backend behind the test suite and the demo driver, and its
//! counters are the observable surface for allocation-behavior properties
//! (no reallocation on unchanged specs, full rebuild on invalidation).

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::foundation::math::Mat4;
use crate::render::gpu::{
    BufferId, BufferKind, DrawBackend, GpuBuffer, GpuDevice, GpuError,
};
use crate::render::primitives::{Camera, Material, Mesh, MeshId, PropertyBlock};

#[derive(Debug, Default)]
struct Counters {
    total_allocations: AtomicUsize,
    live_allocations: AtomicUsize,
    uploads: AtomicUsize,
    bytes_uploaded: AtomicUsize,
}

/// Device that allocates CPU-backed buffers and counts what happens to them
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    counters: Arc<Counters>,
    next_id: AtomicU64,
}

impl HeadlessDevice {
    /// Create a device with zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers allocated over the device's lifetime
    #[must_use]
    pub fn total_allocations(&self) -> usize {
        self.counters.total_allocations.load(Ordering::Relaxed)
    }

    /// Buffers currently allocated and not yet disposed
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        self.counters.live_allocations.load(Ordering::Relaxed)
    }

    /// Number of uploads observed
    #[must_use]
    pub fn uploads(&self) -> usize {
        self.counters.uploads.load(Ordering::Relaxed)
    }

    /// Total bytes uploaded
    #[must_use]
    pub fn bytes_uploaded(&self) -> usize {
        self.counters.bytes_uploaded.load(Ordering::Relaxed)
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(
        &self,
        len: usize,
        stride: usize,
        kind: BufferKind,
    ) -> Result<Box<dyn GpuBuffer>, GpuError> {
        let id = BufferId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.counters.total_allocations.fetch_add(1, Ordering::Relaxed);
        self.counters.live_allocations.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "headless: allocated buffer {:?} ({} x {} bytes, {:?})",
            id,
            len,
            stride,
            kind
        );
        Ok(Box::new(HeadlessBuffer {
            id,
            len,
            stride,
            data: vec![0; len * stride],
            valid: true,
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// CPU-backed buffer handed out by [`HeadlessDevice`]
#[derive(Debug)]
pub struct HeadlessBuffer {
    id: BufferId,
    len: usize,
    stride: usize,
    data: Vec<u8>,
    valid: bool,
    counters: Arc<Counters>,
}

impl HeadlessBuffer {
    /// Current contents, for backends and tests that inspect uploads
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl GpuBuffer for HeadlessBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn len(&self) -> usize {
        self.len
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn upload(&mut self, bytes: &[u8]) -> Result<(), GpuError> {
        if !self.valid {
            return Err(GpuError::InvalidBuffer(self.id));
        }
        if bytes.len() > self.data.len() {
            return Err(GpuError::UploadOverflow {
                got: bytes.len(),
                capacity: self.data.len(),
            });
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        self.counters.uploads.fetch_add(1, Ordering::Relaxed);
        self.counters
            .bytes_uploaded
            .fetch_add(bytes.len(), Ordering::Relaxed);
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn dispose(&mut self) {
        if self.valid {
            self.valid = false;
            self.data = Vec::new();
            self.counters.live_allocations.fetch_sub(1, Ordering::Relaxed);
            log::trace!("headless: disposed buffer {:?}", self.id);
        }
    }
}

impl Drop for HeadlessBuffer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// One recorded draw submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedDraw {
    /// Indirect instanced draw; arguments live in the referenced buffer
    IndexedIndirect {
        /// Mesh drawn
        mesh: MeshId,
        /// Sub-mesh index
        submesh: usize,
        /// Args buffer the call reads from
        args: BufferId,
    },
    /// Direct instanced draw from a CPU transform array
    Instanced {
        /// Mesh drawn
        mesh: MeshId,
        /// Sub-mesh index
        submesh: usize,
        /// Instances submitted in the call
        instances: usize,
    },
}

/// [`DrawBackend`] that records submissions instead of issuing them
#[derive(Debug, Default)]
pub struct RecordingBackend {
    draws: Vec<RecordedDraw>,
}

impl RecordingBackend {
    /// Draws recorded so far, in submission order
    #[must_use]
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Forget all recorded draws
    pub fn clear(&mut self) {
        self.draws.clear();
    }
}

impl DrawBackend for RecordingBackend {
    fn draw_indexed_indirect(
        &mut self,
        _camera: &Camera,
        mesh: &Mesh,
        submesh: usize,
        _material: &Material,
        _block: &PropertyBlock,
        args: BufferId,
    ) -> Result<(), GpuError> {
        self.draws.push(RecordedDraw::IndexedIndirect {
            mesh: mesh.id(),
            submesh,
            args,
        });
        Ok(())
    }

    fn draw_instanced(
        &mut self,
        _camera: &Camera,
        mesh: &Mesh,
        submesh: usize,
        _material: &Material,
        _block: &PropertyBlock,
        transforms: &[Mat4],
    ) -> Result<(), GpuError> {
        self.draws.push(RecordedDraw::Instanced {
            mesh: mesh.id(),
            submesh,
            instances: transforms.len(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_allocation_lifecycle() {
        let device = HeadlessDevice::new();
        let mut buffer = device.create_buffer(4, 64, BufferKind::Structured).unwrap();
        assert_eq!(device.total_allocations(), 1);
        assert_eq!(device.live_allocations(), 1);

        buffer.upload(&[1u8; 64]).unwrap();
        assert_eq!(device.uploads(), 1);
        assert_eq!(device.bytes_uploaded(), 64);

        buffer.dispose();
        buffer.dispose();
        assert_eq!(device.live_allocations(), 0);
        assert_eq!(device.total_allocations(), 1);
    }

    #[test]
    fn upload_to_disposed_buffer_fails() {
        let device = HeadlessDevice::new();
        let mut buffer = device.create_buffer(1, 16, BufferKind::Structured).unwrap();
        buffer.dispose();
        assert!(matches!(
            buffer.upload(&[0u8; 16]),
            Err(GpuError::InvalidBuffer(_))
        ));
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let device = HeadlessDevice::new();
        let mut buffer = device.create_buffer(1, 16, BufferKind::Structured).unwrap();
        assert!(matches!(
            buffer.upload(&[0u8; 32]),
            Err(GpuError::UploadOverflow { got: 32, capacity: 16 })
        ));
    }

    #[test]
    fn zero_length_buffer_is_valid() {
        let device = HeadlessDevice::new();
        let mut buffer = device.create_buffer(0, 64, BufferKind::Structured).unwrap();
        assert!(buffer.is_valid());
        assert!(buffer.is_empty());
        buffer.upload(&[]).unwrap();
    }
}
