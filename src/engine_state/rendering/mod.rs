//! Rendering-side data for chunks.
//!
//! Everything here is CPU-side: the packed vertex format, the face-culling
//! mesher, the upload boundary to the GPU, and debug bounding boxes. Device,
//! pipeline and shader management live behind the [`upload::UploadBridge`].

pub mod debug_bounds;
pub mod meshing;
pub mod upload;
pub mod vertex;

// Re-export commonly used types
pub use debug_bounds::ChunkBounds;
pub use meshing::{mesh_block_grid, ChunkMesh};
pub use upload::{BufferHandle, MemoryUploadBridge, UploadBridge, UploadedMesh};
pub use vertex::PackedVertex;
