//! Mesh identity and sub-mesh geometry ranges

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a mesh
///
/// Allocated from a process-global counter, so two meshes never share an
/// id. This is what makes the cache's (mesh, clip) key collision-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

/// Index range of one sub-mesh within a mesh's index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubMesh {
    /// Number of indices in the range
    pub index_count: u32,

    /// Offset of the first index
    pub index_start: u32,

    /// Value added to each index before vertex lookup
    pub base_vertex: u32,
}

/// A baked mesh as seen by the renderer
///
/// Geometry data itself stays with the driver; the renderer only needs the
/// identity, the vertex count for diagnostics, and per-sub-mesh index
/// ranges for draw arguments.
#[derive(Debug, Clone)]
pub struct Mesh {
    id: MeshId,
    name: String,
    vertex_count: u32,
    submeshes: Vec<SubMesh>,
}

impl Mesh {
    /// Create a mesh with an explicit sub-mesh table
    #[must_use]
    pub fn new(name: &str, vertex_count: u32, submeshes: Vec<SubMesh>) -> Self {
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_owned(),
            vertex_count,
            submeshes,
        }
    }

    /// Create a mesh with a single sub-mesh spanning `index_count` indices
    #[must_use]
    pub fn single_submesh(name: &str, vertex_count: u32, index_count: u32) -> Self {
        Self::new(
            name,
            vertex_count,
            vec![SubMesh {
                index_count,
                index_start: 0,
                base_vertex: 0,
            }],
        )
    }

    /// Unique mesh identity
    #[must_use]
    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Debug name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total vertex count across sub-meshes
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Sub-mesh table
    #[must_use]
    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_ids_are_unique() {
        let a = Mesh::single_submesh("a", 8, 36);
        let b = Mesh::single_submesh("a", 8, 36);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn clone_keeps_identity() {
        let a = Mesh::single_submesh("a", 8, 36);
        let b = a.clone();
        assert_eq!(a.id(), b.id());
    }
}
