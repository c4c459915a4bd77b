//! # Block Grid Module
//!
//! The dense per-chunk voxel store. Every voxel has a [`Material`] in a flat
//! array addressed by `index = x + y*N + z*N*N`, alongside a bit vector of
//! solidity so the mesher can test neighbours without touching material bytes.
//!
//! All coordinate accessors are bounds-checked. Anything outside `[0, N)` on
//! any axis reads as `None` from [`BlockGrid::get`] and as not solid from
//! [`BlockGrid::is_solid_at`], which is what makes boundary voxels expose
//! their outward faces.

use anyhow::ensure;
use bitvec::vec::BitVec;
use cgmath::Point3;

use crate::engine_state::voxels::block::Material;

use super::{
    chunk_creation::BlockGridBuilder, CHUNK_DIMENSION,
    CHUNK_PLANE_SIZE, CHUNK_SIZE,
};

/// A dense N×N×N grid of materials.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockGrid {
    materials: Vec<Material>,
    solid: BitVec,
    solid_count: usize,
}

impl BlockGrid {
    pub(super) fn from_parts(materials: Vec<Material>, solid: BitVec, solid_count: usize) -> Self {
        BlockGrid {
            materials,
            solid,
            solid_count,
        }
    }

    /// Thresholds a noise field into a grid.
    ///
    /// A voxel is AIR when its sample is `>= threshold` and SOLID otherwise.
    /// Samples that compare false both ways (NaN) are AIR.
    ///
    /// # Arguments
    /// * `noise` - One sample per voxel, in linear grid order
    /// * `threshold` - The solid/air cut-off
    ///
    /// # Returns
    /// The thresholded grid, or an error if `noise` is not exactly N³ long.
    pub fn from_noise(noise: &[f32], threshold: f32) -> anyhow::Result<Self> {
        ensure!(
            noise.len() == CHUNK_SIZE as usize,
            "noise field has {} samples, expected {}",
            noise.len(),
            CHUNK_SIZE
        );

        let mut builder = BlockGridBuilder::new();
        for &value in noise {
            builder.push(if value < threshold {
                Material::SOLID
            } else {
                Material::AIR
            });
        }
        builder.finish()
    }

    /// A grid with every voxel set to `material`.
    pub fn filled(material: Material) -> Self {
        let size = CHUNK_SIZE as usize;
        let is_solid = material.is_solid();
        BlockGrid {
            materials: vec![material; size],
            solid: BitVec::repeat(is_solid, size),
            solid_count: if is_solid { size } else { 0 },
        }
    }

    /// A grid of nothing but air.
    pub fn air() -> Self {
        Self::filled(Material::AIR)
    }

    /// Flattens local coordinates into a linear index.
    ///
    /// # Returns
    /// `None` if any coordinate falls outside `[0, N)`.
    #[inline]
    pub fn linear_index(x: i32, y: i32, z: i32) -> Option<usize> {
        let range = 0..CHUNK_DIMENSION;
        if range.contains(&x) && range.contains(&y) && range.contains(&z) {
            Some((x + y * CHUNK_DIMENSION + z * CHUNK_PLANE_SIZE) as usize)
        } else {
            None
        }
    }

    /// The material at the given local coordinates, or `None` out of bounds.
    #[inline]
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<Material> {
        Self::linear_index(x, y, z).map(|index| self.materials[index])
    }

    /// Same as [`BlockGrid::get`] for a point.
    pub fn get_point(&self, position: Point3<i32>) -> Option<Material> {
        self.get(position.x, position.y, position.z)
    }

    /// Whether the voxel is solid. Out-of-bounds coordinates are air.
    #[inline]
    pub fn is_solid_at(&self, x: i32, y: i32, z: i32) -> bool {
        Self::linear_index(x, y, z).is_some_and(|index| self.solid[index])
    }

    /// Replaces the material at the given coordinates.
    ///
    /// # Returns
    /// `false` (and no change) if the coordinates are out of bounds.
    pub fn set(&mut self, x: i32, y: i32, z: i32, material: Material) -> bool {
        let Some(index) = Self::linear_index(x, y, z) else {
            return false;
        };

        let was_solid = self.solid[index];
        let is_solid = material.is_solid();
        match (was_solid, is_solid) {
            (false, true) => self.solid_count += 1,
            (true, false) => self.solid_count -= 1,
            _ => {}
        }
        self.solid.set(index, is_solid);
        self.materials[index] = material;
        true
    }

    /// Number of solid voxels.
    pub fn solid_count(&self) -> usize {
        self.solid_count
    }

    /// `true` when the grid holds no solid voxel at all.
    pub fn is_empty(&self) -> bool {
        self.solid_count == 0
    }

    /// The raw materials in linear order.
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_index_is_x_fastest() {
        assert_eq!(BlockGrid::linear_index(0, 0, 0), Some(0));
        assert_eq!(BlockGrid::linear_index(1, 0, 0), Some(1));
        assert_eq!(
            BlockGrid::linear_index(0, 1, 0),
            Some(CHUNK_DIMENSION as usize)
        );
        assert_eq!(
            BlockGrid::linear_index(0, 0, 1),
            Some(CHUNK_PLANE_SIZE as usize)
        );
        assert_eq!(
            BlockGrid::linear_index(CHUNK_DIMENSION - 1, CHUNK_DIMENSION - 1, CHUNK_DIMENSION - 1),
            Some(CHUNK_SIZE as usize - 1)
        );
    }

    #[test]
    fn out_of_bounds_reads_are_none() {
        let grid = BlockGrid::filled(Material::SOLID);
        assert_eq!(grid.get(-1, 0, 0), None);
        assert_eq!(grid.get(0, CHUNK_DIMENSION, 0), None);
        assert_eq!(grid.get(0, 0, CHUNK_DIMENSION + 5), None);
        assert!(!grid.is_solid_at(CHUNK_DIMENSION, 0, 0));
        assert!(grid.is_solid_at(0, 0, 0));
    }

    #[test]
    fn thresholding_uses_strict_less_than_for_solid() {
        let mut noise = vec![0.5f32; CHUNK_SIZE as usize];
        noise[0] = 0.49;
        noise[1] = f32::NAN;
        let grid = BlockGrid::from_noise(&noise, 0.5).unwrap();

        assert_eq!(grid.get(0, 0, 0), Some(Material::SOLID));
        assert_eq!(grid.get(1, 0, 0), Some(Material::AIR));
        assert_eq!(grid.solid_count(), 1);
    }

    #[test]
    fn wrong_noise_length_is_an_error() {
        assert!(BlockGrid::from_noise(&[0.0; 8], 0.5).is_err());
    }

    #[test]
    fn set_keeps_solid_count_in_step() {
        let mut grid = BlockGrid::air();
        assert!(grid.is_empty());

        assert!(grid.set(2, 2, 2, Material::SOLID));
        assert!(grid.set(2, 2, 2, Material::SOLID));
        assert_eq!(grid.solid_count(), 1);

        assert!(grid.set(2, 2, 2, Material::AIR));
        assert!(grid.is_empty());

        assert!(!grid.set(-1, 0, 0, Material::SOLID));
    }
}
