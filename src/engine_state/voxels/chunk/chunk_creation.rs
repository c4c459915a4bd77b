//! # Chunk Creation Module
//!
//! A builder that fills a [`BlockGrid`] one voxel at a time in linear order
//! (x fastest, then y, then z). The builder keeps the dense material array and
//! the solidity bit vector in step, so the finished grid never has to rescan
//! its contents.

use anyhow::ensure;
use bitvec::vec::BitVec;

use crate::engine_state::voxels::block::Material;

use super::{block_grid::BlockGrid, CHUNK_SIZE};

/// Incrementally builds a [`BlockGrid`].
///
/// Voxels must be pushed in the grid's linear addressing order,
/// `index = x + y*N + z*N*N`.
pub struct BlockGridBuilder {
    /// Materials pushed so far
    materials: Vec<Material>,
    /// One bit per pushed voxel, set when the voxel is solid
    solid: BitVec,
    /// Number of set bits in `solid`
    solid_count: usize,
}

impl BlockGridBuilder {
    /// Creates an empty builder with room for a full chunk.
    pub fn new() -> Self {
        BlockGridBuilder {
            materials: Vec::with_capacity(CHUNK_SIZE as usize),
            solid: BitVec::with_capacity(CHUNK_SIZE as usize),
            solid_count: 0,
        }
    }

    /// Appends the material for the next voxel in linear order.
    ///
    /// # Arguments
    /// * `material` - The material of the voxel at the current position
    pub fn push(&mut self, material: Material) {
        let is_solid = material.is_solid();
        self.materials.push(material);
        self.solid.push(is_solid);
        if is_solid {
            self.solid_count += 1;
        }
    }

    /// Number of voxels pushed so far.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Returns `true` if nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Finalizes the builder.
    ///
    /// # Returns
    /// The finished grid, or an error if the builder does not hold exactly one
    /// chunk's worth of voxels.
    pub fn finish(self) -> anyhow::Result<BlockGrid> {
        ensure!(
            self.materials.len() == CHUNK_SIZE as usize,
            "block grid needs {} voxels, got {}",
            CHUNK_SIZE,
            self.materials.len()
        );
        Ok(BlockGrid::from_parts(
            self.materials,
            self.solid,
            self.solid_count,
        ))
    }
}

impl Default for BlockGridBuilder {
    fn default() -> Self {
        Self::new()
    }
}
