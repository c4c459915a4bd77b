//! One exposed voxel side and the four packed corners it turns into.

use cgmath::{Point3, Vector3};

use crate::engine_state::rendering::vertex::PackedVertex;
use crate::engine_state::voxels::block::block_side::BlockSide;

/// Corner offsets of the quad on each side of a unit voxel, indexed by
/// `BlockSide as usize`. Corner order is the winding the index fan
/// `{0,1,2,2,3,0}` expects, counter-clockwise seen from outside the voxel.
const CORNER_OFFSETS: [[[u32; 3]; 4]; 6] = [
    // FRONT (+Z)
    [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]],
    // BACK (-Z)
    [[1, 0, 0], [0, 0, 0], [0, 1, 0], [1, 1, 0]],
    // BOTTOM (-Y)
    [[0, 0, 0], [1, 0, 0], [1, 0, 1], [0, 0, 1]],
    // TOP (+Y)
    [[0, 1, 1], [1, 1, 1], [1, 1, 0], [0, 1, 0]],
    // LEFT (-X)
    [[0, 0, 0], [0, 0, 1], [0, 1, 1], [0, 1, 0]],
    // RIGHT (+X)
    [[1, 0, 1], [1, 0, 0], [1, 1, 0], [1, 1, 1]],
];

/// A single exposed quad of one voxel.
///
/// Carries just enough to produce the four packed vertices: the voxel's local
/// position, the side the quad faces, and its shading inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Local position of the voxel that owns the face
    pub voxel: Point3<u32>,
    /// Which side of the voxel this face represents
    pub block_side: BlockSide,
    /// Texture id for this face
    pub texture: u32,
    /// Light level for all four corners
    pub light: u32,
}

impl Face {
    /// Creates a new face for a voxel.
    ///
    /// # Arguments
    /// * `voxel` - The local coordinates of the voxel
    /// * `block_side` - Which side of the voxel this face represents
    /// * `texture` - Texture id used for the face
    /// * `light` - Light level packed into every corner
    pub fn new(voxel: Point3<u32>, block_side: BlockSide, texture: u32, light: u32) -> Self {
        Face {
            voxel,
            block_side,
            texture,
            light,
        }
    }

    /// The four corner positions of the quad in winding order.
    pub fn corners(&self) -> [Point3<u32>; 4] {
        CORNER_OFFSETS[self.block_side as usize]
            .map(|[dx, dy, dz]| self.voxel + Vector3::new(dx, dy, dz))
    }

    /// The four packed vertices of the quad in winding order.
    ///
    /// Corner `i` of the table carries corner index `i`, so the shader can pick
    /// the matching UV.
    pub fn vertices(&self) -> [PackedVertex; 4] {
        let corners = self.corners();
        std::array::from_fn(|corner| {
            PackedVertex::new(corners[corner], corner as u32, self.light, self.texture)
        })
    }
}
