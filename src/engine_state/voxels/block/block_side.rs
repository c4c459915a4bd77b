//! # Block Side Module
//!
//! The six axis-aligned faces of a voxel and the unit offsets that lead to the
//! neighbouring voxel across each face.

use cgmath::Vector3;

/// One of the six faces of a voxel.
///
/// The discriminant doubles as the index into per-face tables such as
/// [`BLOCK_TYPE_TO_TEXTURE_INDICES`](super::BLOCK_TYPE_TO_TEXTURE_INDICES).
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns the faces in the order the mesher emits them:
    /// front, back, right, left, top, bottom.
    pub fn emission_order() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::RIGHT,
            BlockSide::LEFT,
            BlockSide::TOP,
            BlockSide::BOTTOM,
        ]
    }

    /// Unit offset from a voxel to its neighbour across this face.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }
}
