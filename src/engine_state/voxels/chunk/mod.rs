//! # Chunk Module
//!
//! A chunk is a 32×32×32 cube of voxels: the unit of generation, meshing and
//! upload. It owns one [`BlockGrid`], the [`ChunkMesh`] built from it, the
//! world transform used to place that mesh, and four lifecycle flags.
//!
//! ## Lifecycle
//!
//! ```text
//! created -> generated -> empty                (terminal)
//!                      -> meshed -> loaded     (terminal)
//! ```
//!
//! Transitions only move forward. A chunk's block data is written once by
//! [`Chunk::generate`] on a worker thread and is read-only after the chunk is
//! published to the registry. An empty chunk is a normal outcome, not an
//! error: it is never meshed and never uploaded.

use anyhow::{bail, ensure};
use cgmath::{Matrix4, Point3, Vector3};

use crate::engine_state::rendering::{
    debug_bounds::ChunkBounds,
    meshing::{mesh_block_grid, ChunkMesh},
    vertex::{PackedVertex, POSITION_MASK},
};
use crate::engine_state::voxels::block::Material;

use block_grid::BlockGrid;

pub mod block_grid;
pub mod chunk_creation;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 32;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

// Quad corners reach CHUNK_DIMENSION itself, which must fit a packed position field.
const _: () = assert!(CHUNK_DIMENSION > 0 && CHUNK_DIMENSION as u32 <= POSITION_MASK);

/// Where a chunk is in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Allocated, block data not computed yet
    Created,
    /// Block data computed, mesh not built yet
    Generated,
    /// No solid voxel; nothing to mesh or upload
    Empty,
    /// Mesh built and waiting for upload
    Meshed,
    /// Mesh handed to the render scene
    Loaded,
}

/// One cube of voxels in the world.
#[derive(Debug)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    position: Point3<i32>,
    grid: BlockGrid,
    mesh: ChunkMesh,
    /// Translation from chunk-local to world space.
    transform: Matrix4<f32>,
    generated: bool,
    empty: bool,
    meshed: bool,
    loaded: bool,
}

impl Chunk {
    /// Creates a chunk at `position` with no block data yet.
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates of the new chunk
    pub fn new(position: Point3<i32>) -> Self {
        let origin = Self::world_origin_of(position);
        Chunk {
            position,
            grid: BlockGrid::air(),
            mesh: ChunkMesh::new(),
            transform: Matrix4::from_translation(Vector3::new(origin.x, origin.y, origin.z)),
            generated: false,
            empty: false,
            meshed: false,
            loaded: false,
        }
    }

    /// Creates an already generated chunk from a prepared grid.
    ///
    /// The mesh is not built; call [`Chunk::regenerate_mesh`] if the chunk is
    /// not empty.
    pub fn from_grid(position: Point3<i32>, grid: BlockGrid) -> Self {
        let mut chunk = Self::new(position);
        chunk.empty = grid.is_empty();
        chunk.grid = grid;
        chunk.generated = true;
        chunk
    }

    /// World-space position of the chunk's (0, 0, 0) corner.
    pub fn world_origin_of(position: Point3<i32>) -> Point3<f32> {
        Point3::new(
            (position.x * CHUNK_DIMENSION) as f32,
            (position.y * CHUNK_DIMENSION) as f32,
            (position.z * CHUNK_DIMENSION) as f32,
        )
    }

    /// Thresholds a noise field into this chunk's block data.
    ///
    /// If no sample is below `threshold` the chunk is marked empty and the grid
    /// stays all air without being built voxel by voxel.
    ///
    /// # Arguments
    /// * `noise` - N³ samples in linear grid order
    /// * `threshold` - Samples `>= threshold` are air
    ///
    /// # Returns
    /// `Ok(true)` if the chunk has at least one solid voxel, `Ok(false)` if it is
    /// empty. Errors if the chunk was already generated or the noise has the
    /// wrong length.
    pub fn generate(&mut self, noise: &[f32], threshold: f32) -> anyhow::Result<bool> {
        ensure!(
            !self.generated,
            "chunk {:?} is already generated",
            self.position
        );
        ensure!(
            noise.len() == CHUNK_SIZE as usize,
            "noise field for chunk {:?} has {} samples, expected {}",
            self.position,
            noise.len(),
            CHUNK_SIZE
        );

        if !noise.iter().any(|value| *value < threshold) {
            self.generated = true;
            self.empty = true;
            return Ok(false);
        }

        self.grid = BlockGrid::from_noise(noise, threshold)?;
        self.generated = true;
        self.empty = self.grid.is_empty();
        Ok(!self.empty)
    }

    /// Runs the mesher over the block data, replacing any previous mesh.
    ///
    /// Re-running re-allocates both buffers; callers check
    /// [`Chunk::is_meshed`] first. A mesh with no faces marks the chunk empty.
    ///
    /// # Returns
    /// The number of quads produced.
    pub fn regenerate_mesh(&mut self) -> anyhow::Result<usize> {
        if !self.generated {
            bail!("chunk {:?} cannot be meshed before generation", self.position);
        }

        self.mesh = mesh_block_grid(&self.grid);
        if self.mesh.is_empty() {
            self.empty = true;
            self.meshed = false;
        } else {
            self.meshed = true;
        }
        Ok(self.mesh.face_count())
    }

    /// The chunk coordinate.
    pub fn position(&self) -> Point3<i32> {
        self.position
    }

    /// The block data.
    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// The material at a chunk-local position, `None` out of bounds.
    pub fn block_at(&self, local: Point3<i32>) -> Option<Material> {
        self.grid.get_point(local)
    }

    /// The mesh built by the last [`Chunk::regenerate_mesh`].
    pub fn mesh(&self) -> &ChunkMesh {
        &self.mesh
    }

    /// The vertex and index arrays to upload.
    pub fn mesh_arrays(&self) -> (&[PackedVertex], &[u32]) {
        (self.mesh.vertices(), self.mesh.indices())
    }

    /// Chunk-local to world translation.
    pub fn transform(&self) -> Matrix4<f32> {
        self.transform
    }

    /// World-space bounding box, for debug overlays.
    pub fn bounds(&self) -> ChunkBounds {
        ChunkBounds::for_chunk(self.position)
    }

    /// Block data has been computed.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Block data holds no solid voxel.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// A non-empty mesh has been built.
    pub fn is_meshed(&self) -> bool {
        self.meshed
    }

    /// The mesh has been handed to the render scene.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Marks the mesh as uploaded.
    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    /// Drops the CPU-side mesh arrays once they live on the GPU.
    ///
    /// Flags are untouched, so the chunk stays `meshed` and `loaded`.
    pub fn release_mesh_arrays(&mut self) {
        self.mesh.clear();
    }

    /// The lifecycle state derived from the flags.
    pub fn state(&self) -> ChunkState {
        if !self.generated {
            ChunkState::Created
        } else if self.empty {
            ChunkState::Empty
        } else if self.loaded {
            ChunkState::Loaded
        } else if self.meshed {
            ChunkState::Meshed
        } else {
            ChunkState::Generated
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Transform, Vector4};

    use super::*;

    fn constant(value: f32) -> Vec<f32> {
        vec![value; CHUNK_SIZE as usize]
    }

    #[test]
    fn all_air_noise_short_circuits_to_empty() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert_eq!(chunk.state(), ChunkState::Created);

        assert!(!chunk.generate(&constant(1.0), 0.5).unwrap());
        assert!(chunk.is_generated());
        assert!(chunk.is_empty());
        assert_eq!(chunk.state(), ChunkState::Empty);

        assert_eq!(chunk.regenerate_mesh().unwrap(), 0);
        let (vertices, indices) = chunk.mesh_arrays();
        assert!(vertices.is_empty());
        assert!(indices.is_empty());
        assert!(!chunk.is_meshed());
    }

    #[test]
    fn full_chunk_moves_through_meshed_to_loaded() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(chunk.generate(&constant(0.0), 0.5).unwrap());
        assert_eq!(chunk.state(), ChunkState::Generated);

        assert_eq!(chunk.regenerate_mesh().unwrap(), 6 * 32 * 32);
        assert_eq!(chunk.state(), ChunkState::Meshed);

        chunk.set_loaded(true);
        assert_eq!(chunk.state(), ChunkState::Loaded);
    }

    #[test]
    fn generation_happens_once() {
        let mut chunk = Chunk::new(Point3::new(1, 2, 3));
        chunk.generate(&constant(0.0), 0.5).unwrap();
        assert!(chunk.generate(&constant(0.0), 0.5).is_err());
    }

    #[test]
    fn meshing_requires_generation() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(chunk.regenerate_mesh().is_err());
    }

    #[test]
    fn wrong_noise_length_is_rejected() {
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(chunk.generate(&[0.0; 3], 0.5).is_err());
        assert!(!chunk.is_generated());
    }

    #[test]
    fn transform_translates_to_world_origin() {
        let chunk = Chunk::new(Point3::new(1, -2, 3));
        let moved = chunk.transform().transform_point(Point3::new(0.0, 0.0, 0.0));
        assert_eq!(moved, Point3::new(32.0, -64.0, 96.0));
        assert_eq!(
            chunk.transform() * Vector4::new(1.0, 1.0, 1.0, 1.0),
            Vector4::new(33.0, -63.0, 97.0, 1.0)
        );
    }

    #[test]
    fn releasing_arrays_keeps_flags() {
        let mut chunk = Chunk::from_grid(
            Point3::new(0, 0, 0),
            BlockGrid::filled(Material::SOLID),
        );
        chunk.regenerate_mesh().unwrap();
        chunk.set_loaded(true);
        chunk.release_mesh_arrays();

        assert!(chunk.mesh().is_empty());
        assert_eq!(chunk.state(), ChunkState::Loaded);
    }
}
