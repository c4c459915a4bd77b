//! Mesh data structures for chunk rendering.
//!
//! A [`ChunkMesh`] is the CPU-side result of meshing one chunk: a vertex array
//! of packed words and a parallel triangle index array, ready to be copied
//! into GPU buffers by the upload bridge.

use crate::engine_state::rendering::vertex::PackedVertex;

use super::face::Face;

/// Index pattern for one quad: two triangles fanned from corner 0.
pub const FACE_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Vertices emitted per quad.
pub const VERTICES_PER_FACE: usize = 4;

/// Indices emitted per quad.
pub const INDICES_PER_FACE: usize = FACE_INDICES.len();

/// The vertex and index buffers of one chunk.
///
/// Invariant: `indices.len() == vertices.len() / 4 * 6`, and every index
/// points at a vertex of the same quad.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    vertices: Vec<PackedVertex>,
    indices: Vec<u32>,
}

impl ChunkMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mesh with room for `faces` quads.
    pub fn with_face_capacity(faces: usize) -> Self {
        ChunkMesh {
            vertices: Vec::with_capacity(faces * VERTICES_PER_FACE),
            indices: Vec::with_capacity(faces * INDICES_PER_FACE),
        }
    }

    /// Appends one quad.
    ///
    /// The four vertices go on the end of the vertex array and the index fan is
    /// offset by the vertex count before the push.
    pub fn push_face(&mut self, face: &Face) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&face.vertices());
        self.indices
            .extend(FACE_INDICES.iter().map(|index| base + index));
    }

    /// Number of quads in the mesh.
    pub fn face_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_FACE
    }

    /// `true` if the mesh holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The packed vertices.
    pub fn vertices(&self) -> &[PackedVertex] {
        &self.vertices
    }

    /// The triangle indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// The vertex array as raw bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Drops the CPU-side arrays and their allocations.
    pub fn clear(&mut self) {
        self.vertices = Vec::new();
        self.indices = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::voxels::block::block_side::BlockSide;

    #[test]
    fn indices_are_offset_per_face() {
        let mut mesh = ChunkMesh::new();
        mesh.push_face(&Face::new(Point3::new(0, 0, 0), BlockSide::TOP, 0, 1));
        mesh.push_face(&Face::new(Point3::new(1, 0, 0), BlockSide::TOP, 0, 1));

        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.indices(), &[0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert_eq!(mesh.vertex_bytes().len(), 8 * 4);
    }

    #[test]
    fn clear_empties_both_arrays() {
        let mut mesh = ChunkMesh::with_face_capacity(1);
        mesh.push_face(&Face::new(Point3::new(0, 0, 0), BlockSide::LEFT, 0, 1));
        mesh.clear();

        assert!(mesh.is_empty());
        assert!(mesh.indices().is_empty());
    }
}
