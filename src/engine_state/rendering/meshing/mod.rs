//! Face-culling mesh generation for chunks.
//!
//! Every solid voxel is tested against its six axis neighbours. A quad is
//! emitted for each side whose neighbour is air, and for each side that faces
//! out of the chunk. Meshing is chunk-local: what actually lies in the
//! neighbouring chunk is never consulted, so two solid chunks that touch both
//! keep their boundary quads.
//!
//! # Ordering
//! Voxels are visited with x outermost and z innermost. Within one voxel the
//! sides are emitted front, back, right, left, top, bottom. Both orders are
//! fixed so that meshing the same grid always produces identical buffers.
//!
//! # Cost
//! O(N³) neighbour tests and at most 6·N³ quads. Interior faces are culled, so
//! a full chunk produces 6·N² quads.

use cgmath::Point3;

use crate::engine_state::voxels::{block::block_side::BlockSide, chunk::block_grid::BlockGrid};

pub mod mesh;

pub use mesh::*;

use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;

/// Light level written into every vertex until lighting is computed.
pub const DEFAULT_LIGHT_LEVEL: u32 = 1;

/// Builds the mesh for one block grid.
///
/// # Arguments
/// * `grid` - The voxels to mesh
///
/// # Returns
/// The vertex and index buffers. Empty if the grid has no solid voxel.
pub fn mesh_block_grid(grid: &BlockGrid) -> ChunkMesh {
    if grid.is_empty() {
        return ChunkMesh::new();
    }

    let mut mesh = ChunkMesh::with_face_capacity(estimate_face_count(grid));

    for x in 0..CHUNK_DIMENSION {
        for y in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                let Some(material) = grid.get(x, y, z).filter(|m| m.is_solid()) else {
                    continue;
                };

                for side in BlockSide::emission_order() {
                    let neighbour = Point3::new(x, y, z) + side.normal();
                    if grid.is_solid_at(neighbour.x, neighbour.y, neighbour.z) {
                        continue;
                    }

                    mesh.push_face(&Face::new(
                        Point3::new(x as u32, y as u32, z as u32),
                        side,
                        material.texture_index(side),
                        DEFAULT_LIGHT_LEVEL,
                    ));
                }
            }
        }
    }

    mesh
}

/// Rough upper bound used to size the buffers up front: every solid voxel on
/// the surface of a blob exposes about one face, capped at the full-chunk count.
fn estimate_face_count(grid: &BlockGrid) -> usize {
    let surface = (CHUNK_DIMENSION * CHUNK_DIMENSION * 6) as usize;
    grid.solid_count().min(surface)
}
