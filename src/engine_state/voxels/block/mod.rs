//! # Block Module
//!
//! Per-voxel material data. A voxel stores a single [`Material`], a one-byte id
//! that is either air (`0`) or one of the solid [`BlockType`]s. Meshing only cares
//! about the air / non-air split; the remaining ids select textures.

use block_side::BlockSide;
use block_type::BlockType;

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to store a material id.
pub type BlockTypeSize = u8;

/// Texture indices per solid block type, one per face in [`BlockSide`] order:
/// [Front, Back, Bottom, Top, Left, Right].
///
/// Indexed by `BlockType as usize - 1`; air has no texture.
pub static BLOCK_TYPE_TO_TEXTURE_INDICES: [[u32; 6]; 4] = [
    [0, 0, 0, 0, 0, 0], // STONE
    [1, 1, 1, 1, 1, 1], // DIRT
    [2, 2, 1, 3, 2, 2], // GRASS (top: 3, bottom: 1, sides: 2)
    [4, 4, 4, 4, 4, 4], // WOOD
];

/// A single voxel's substance.
///
/// # Memory Layout
/// `#[repr(C)]` with a single byte so a grid of materials can be viewed as raw
/// bytes through `bytemuck`.
#[repr(C)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug, Default)]
pub struct Material {
    /// The material id. `0` is air, anything else is solid.
    pub id: BlockTypeSize,
}

impl Material {
    /// Empty space.
    pub const AIR: Material = Material {
        id: BlockType::AIR as BlockTypeSize,
    };

    /// The material produced by noise thresholding.
    pub const SOLID: Material = Material {
        id: BlockType::STONE as BlockTypeSize,
    };

    /// Creates a material of the given block type.
    ///
    /// # Arguments
    /// * `block_type` - The type of block to create
    ///
    /// # Returns
    /// A new `Material` carrying the block type's id.
    pub fn new(block_type: BlockType) -> Self {
        Material {
            id: block_type as BlockTypeSize,
        }
    }

    /// Returns `true` for every id other than air.
    #[inline]
    pub fn is_solid(self) -> bool {
        self.id != Self::AIR.id
    }

    /// Looks up the block type for this id, if the id is known.
    pub fn block_type(self) -> Option<BlockType> {
        BlockType::from_id(self.id)
    }

    /// Texture index used for the given face of this material.
    ///
    /// Air and unknown ids fall back to texture `0`.
    pub fn texture_index(self, side: BlockSide) -> u32 {
        match self.block_type() {
            Some(BlockType::AIR) | None => 0,
            Some(block_type) => {
                BLOCK_TYPE_TO_TEXTURE_INDICES[block_type as usize - 1][side as usize]
            }
        }
    }
}

impl From<BlockType> for Material {
    fn from(block_type: BlockType) -> Self {
        Material::new(block_type)
    }
}
