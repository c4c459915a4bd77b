//! # Block Type Module
//!
//! The known material ids and their conversion from the compact stored form.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates the block types a voxel can hold.
///
/// The discriminant is the stored material id, so `AIR` must stay `0`.
/// `FromPrimitive` gives the checked conversion back from a raw id.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Empty space, never meshed.
    AIR = 0,

    /// The default solid material produced by terrain thresholding.
    STONE = 1,

    /// A plain dirt block.
    DIRT = 2,

    /// A grass block with different textures on top and bottom.
    GRASS = 3,

    /// A wooden block with a bark texture on all sides.
    WOOD = 4,
}

impl BlockType {
    /// Converts a stored id back into a `BlockType`.
    ///
    /// # Arguments
    /// * `id` - The block type as a `BlockTypeSize`
    ///
    /// # Returns
    /// The matching `BlockType`, or `None` for an unknown id.
    pub fn from_id(id: BlockTypeSize) -> Option<Self> {
        FromPrimitive::from_u8(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for block_type in [
            BlockType::AIR,
            BlockType::STONE,
            BlockType::DIRT,
            BlockType::GRASS,
            BlockType::WOOD,
        ] {
            assert_eq!(BlockType::from_id(block_type as u8), Some(block_type));
        }
        assert_eq!(BlockType::from_id(200), None);
    }
}
