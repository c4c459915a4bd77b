//! Packed vertex format for chunk meshes.
//!
//! Each vertex is a single `u32`. The shader unpacks the fields with the same
//! shifts and masks defined here:
//!
//! | bits    | field   | width |
//! |---------|---------|-------|
//! | 0..6    | x       | 6     |
//! | 6..12   | y       | 6     |
//! | 12..18  | z       | 6     |
//! | 18..21  | light   | 3     |
//! | 21..23  | corner  | 2     |
//! | 23..32  | texture | 9     |
//!
//! Positions are chunk-local and may equal the chunk edge length (a quad on the
//! far boundary), which is why the position fields are 6 bits wide for N = 32.

use cgmath::Point3;

/// Bit offset of the x coordinate.
pub const X_SHIFT: u32 = 0;
/// Bit offset of the y coordinate.
pub const Y_SHIFT: u32 = 6;
/// Bit offset of the z coordinate.
pub const Z_SHIFT: u32 = 12;
/// Bit offset of the light level.
pub const LIGHT_SHIFT: u32 = 18;
/// Bit offset of the face-corner index.
pub const CORNER_SHIFT: u32 = 21;
/// Bit offset of the texture id.
pub const TEXTURE_SHIFT: u32 = 23;

/// Mask for one position field.
pub const POSITION_MASK: u32 = (1 << 6) - 1;
/// Mask for the light level.
pub const LIGHT_MASK: u32 = (1 << 3) - 1;
/// Mask for the face-corner index.
pub const CORNER_MASK: u32 = (1 << 2) - 1;
/// Mask for the texture id.
pub const TEXTURE_MASK: u32 = (1 << 9) - 1;

/// A vertex in the voxel rendering pipeline, packed into one word.
///
/// # Memory Layout
/// `#[repr(C)]` around a single `u32`, so a `&[PackedVertex]` can be handed to
/// the upload bridge as bytes with `bytemuck::cast_slice`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedVertex {
    bits: u32,
}

/// The fields of a [`PackedVertex`] after unpacking.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UnpackedVertex {
    /// Chunk-local corner position
    pub position: Point3<u32>,
    /// Which of the face's four corners this is (0..=3)
    pub corner: u32,
    /// Light level (0..=7)
    pub light: u32,
    /// Texture id (0..=511)
    pub texture: u32,
}

impl PackedVertex {
    /// Packs the given fields into one word.
    ///
    /// # Arguments
    /// * `position` - Chunk-local corner position, each component in `0..=N`
    /// * `corner` - Face-corner index used for UV lookup in the shader
    /// * `light` - Light level
    /// * `texture` - Texture id
    ///
    /// # Returns
    /// The packed vertex. Values wider than their field are truncated to it.
    pub fn new(position: Point3<u32>, corner: u32, light: u32, texture: u32) -> Self {
        debug_assert!(position.x <= POSITION_MASK);
        debug_assert!(position.y <= POSITION_MASK);
        debug_assert!(position.z <= POSITION_MASK);
        debug_assert!(corner <= CORNER_MASK);
        debug_assert!(light <= LIGHT_MASK);
        debug_assert!(texture <= TEXTURE_MASK);

        let bits = ((position.x & POSITION_MASK) << X_SHIFT)
            | ((position.y & POSITION_MASK) << Y_SHIFT)
            | ((position.z & POSITION_MASK) << Z_SHIFT)
            | ((light & LIGHT_MASK) << LIGHT_SHIFT)
            | ((corner & CORNER_MASK) << CORNER_SHIFT)
            | ((texture & TEXTURE_MASK) << TEXTURE_SHIFT);

        PackedVertex { bits }
    }

    /// The raw packed word.
    pub fn bits(self) -> u32 {
        self.bits
    }

    /// Chunk-local position.
    pub fn position(self) -> Point3<u32> {
        Point3::new(
            (self.bits >> X_SHIFT) & POSITION_MASK,
            (self.bits >> Y_SHIFT) & POSITION_MASK,
            (self.bits >> Z_SHIFT) & POSITION_MASK,
        )
    }

    /// Face-corner index.
    pub fn corner(self) -> u32 {
        (self.bits >> CORNER_SHIFT) & CORNER_MASK
    }

    /// Light level.
    pub fn light(self) -> u32 {
        (self.bits >> LIGHT_SHIFT) & LIGHT_MASK
    }

    /// Texture id.
    pub fn texture(self) -> u32 {
        (self.bits >> TEXTURE_SHIFT) & TEXTURE_MASK
    }

    /// Splits the word back into its fields.
    pub fn unpack(self) -> UnpackedVertex {
        UnpackedVertex {
            position: self.position(),
            corner: self.corner(),
            light: self.light(),
            texture: self.texture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vertex_round_trips() {
        let vertex = PackedVertex::new(Point3::new(3, 5, 7), 2, 1, 0);
        let unpacked = vertex.unpack();

        assert_eq!(unpacked.position, Point3::new(3, 5, 7));
        assert_eq!(unpacked.corner, 2);
        assert_eq!(unpacked.light, 1);
        assert_eq!(unpacked.texture, 0);
        assert_eq!(vertex.bits(), 3 | (5 << 6) | (7 << 12) | (1 << 18) | (2 << 21));
    }

    #[test]
    fn field_extremes_do_not_overlap() {
        let vertex = PackedVertex::new(
            Point3::new(POSITION_MASK, 0, POSITION_MASK),
            CORNER_MASK,
            0,
            TEXTURE_MASK,
        );
        let unpacked = vertex.unpack();

        assert_eq!(unpacked.position, Point3::new(POSITION_MASK, 0, POSITION_MASK));
        assert_eq!(unpacked.corner, CORNER_MASK);
        assert_eq!(unpacked.light, 0);
        assert_eq!(unpacked.texture, TEXTURE_MASK);
        assert_eq!(vertex.bits() >> TEXTURE_SHIFT, TEXTURE_MASK);
    }

    #[test]
    fn vertex_is_one_word() {
        assert_eq!(std::mem::size_of::<PackedVertex>(), 4);
    }
}
