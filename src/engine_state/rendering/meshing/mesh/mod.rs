//! Per-chunk mesh buffers and the quad faces they are built from.

pub mod face;
#[allow(clippy::module_inception)]
pub mod mesh;

pub use face::Face;
pub use mesh::{ChunkMesh, FACE_INDICES};
