//! # Upload Module
//!
//! The boundary between chunk meshing and whatever owns GPU memory.
//!
//! The pipeline never touches graphics-API types. It hands raw vertex bytes
//! and `u32` indices to an [`UploadBridge`] and keeps the opaque
//! [`BufferHandle`]s it gets back, releasing them when a chunk is evicted.
//!
//! [`MemoryUploadBridge`] is a bridge that keeps buffers in host memory and
//! tracks per-buffer analytics. It backs the headless driver and the tests.

use std::collections::HashMap;

use anyhow::{anyhow, Context};
use cgmath::Matrix4;

use crate::engine_state::voxels::{chunk::Chunk, world::ChunkHandle};

/// Opaque id of an uploaded buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Receives mesh arrays and turns them into GPU buffers.
pub trait UploadBridge {
    /// Creates a vertex buffer from raw bytes.
    fn upload_vertex_buffer(&mut self, bytes: &[u8]) -> anyhow::Result<BufferHandle>;

    /// Creates an index buffer.
    fn upload_index_buffer(&mut self, indices: &[u32]) -> anyhow::Result<BufferHandle>;

    /// Frees a buffer created by this bridge.
    fn release(&mut self, handle: BufferHandle) -> anyhow::Result<()>;
}

/// A chunk mesh living in the render scene.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedMesh {
    /// Registry handle of the chunk the mesh came from
    pub chunk: ChunkHandle,
    /// Packed vertices
    pub vertex_buffer: BufferHandle,
    /// Triangle indices
    pub index_buffer: BufferHandle,
    /// Number of indices to draw
    pub index_count: u32,
    /// Chunk-local to world transform
    pub transform: Matrix4<f32>,
}

impl UploadedMesh {
    /// Uploads a chunk's mesh arrays through `bridge`.
    ///
    /// If the index upload fails the vertex buffer is released again, so a
    /// failed upload leaks nothing.
    ///
    /// # Arguments
    /// * `bridge` - Where the buffers are created
    /// * `handle` - The chunk's registry handle
    /// * `chunk` - A meshed chunk
    pub fn upload(
        bridge: &mut dyn UploadBridge,
        handle: ChunkHandle,
        chunk: &Chunk,
    ) -> anyhow::Result<Self> {
        let position = chunk.position();
        let vertex_buffer = bridge
            .upload_vertex_buffer(chunk.mesh().vertex_bytes())
            .with_context(|| format!("uploading vertices of chunk {position:?}"))?;

        let (_, indices) = chunk.mesh_arrays();
        let index_buffer = match bridge.upload_index_buffer(indices) {
            Ok(buffer) => buffer,
            Err(error) => {
                if let Err(release_error) = bridge.release(vertex_buffer) {
                    log::warn!("Could not release vertex buffer {vertex_buffer:?}: {release_error:#}");
                }
                return Err(error.context(format!("uploading indices of chunk {position:?}")));
            }
        };

        Ok(UploadedMesh {
            chunk: handle,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            transform: chunk.transform(),
        })
    }

    /// Releases both buffers.
    pub fn release(&self, bridge: &mut dyn UploadBridge) -> anyhow::Result<()> {
        let vertex = bridge.release(self.vertex_buffer);
        let index = bridge.release(self.index_buffer);
        vertex.and(index)
    }
}

/// What a buffer holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferKind {
    /// Packed vertices
    Vertex,
    /// Triangle indices
    Index,
}

/// Analytics for one stored buffer.
#[derive(Debug)]
struct BufferAnalytics {
    kind: BufferKind,
    /// Bytes held by the buffer
    allocated_memory: u64,
}

/// An [`UploadBridge`] that keeps buffers in host memory.
#[derive(Debug, Default)]
pub struct MemoryUploadBridge {
    buffers: HashMap<BufferHandle, Vec<u8>>,
    buffer_analytics: HashMap<BufferHandle, BufferAnalytics>,
    next_handle: u64,
    uploads: u64,
    releases: u64,
}

impl MemoryUploadBridge {
    /// Creates a bridge with no buffers.
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&mut self, kind: BufferKind, bytes: Vec<u8>) -> BufferHandle {
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        self.uploads += 1;
        self.buffer_analytics.insert(
            handle,
            BufferAnalytics {
                kind,
                allocated_memory: bytes.len() as u64,
            },
        );
        log::trace!("Stored {kind:?} buffer {handle:?} ({} bytes)", bytes.len());
        self.buffers.insert(handle, bytes);
        handle
    }

    /// The bytes of a live buffer.
    pub fn buffer(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(Vec::as_slice)
    }

    /// The kind of a live buffer.
    pub fn buffer_kind(&self, handle: BufferHandle) -> Option<BufferKind> {
        self.buffer_analytics.get(&handle).map(|a| a.kind)
    }

    /// Number of buffers not yet released.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Bytes held across all live buffers.
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .fold(0, |acc, analytics| acc + analytics.allocated_memory)
    }

    /// Buffers created so far.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Buffers released so far.
    pub fn releases(&self) -> u64 {
        self.releases
    }
}

impl UploadBridge for MemoryUploadBridge {
    fn upload_vertex_buffer(&mut self, bytes: &[u8]) -> anyhow::Result<BufferHandle> {
        Ok(self.store(BufferKind::Vertex, bytes.to_vec()))
    }

    fn upload_index_buffer(&mut self, indices: &[u32]) -> anyhow::Result<BufferHandle> {
        Ok(self.store(
            BufferKind::Index,
            bytemuck::cast_slice(indices).to_vec(),
        ))
    }

    fn release(&mut self, handle: BufferHandle) -> anyhow::Result<()> {
        self.buffers
            .remove(&handle)
            .ok_or_else(|| anyhow!("buffer {handle:?} is not live"))?;
        self.buffer_analytics.remove(&handle);
        self.releases += 1;
        log::trace!("Released buffer {handle:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::voxels::{
        block::Material,
        chunk::block_grid::BlockGrid,
        world::ChunkRegistry,
    };

    fn meshed_chunk() -> (ChunkHandle, Chunk) {
        let registry = ChunkRegistry::new();
        let position = Point3::new(0, 0, 0);
        registry.enqueue(position);
        registry.claim_next();

        let mut grid = BlockGrid::air();
        grid.set(1, 1, 1, Material::SOLID);
        let mut chunk = Chunk::from_grid(position, grid.clone());
        chunk.regenerate_mesh().unwrap();

        let handle = registry
            .publish(Chunk::from_grid(position, grid), web_time::Duration::ZERO)
            .unwrap();
        (handle, chunk)
    }

    struct RejectIndices(MemoryUploadBridge);

    impl UploadBridge for RejectIndices {
        fn upload_vertex_buffer(&mut self, bytes: &[u8]) -> anyhow::Result<BufferHandle> {
            self.0.upload_vertex_buffer(bytes)
        }

        fn upload_index_buffer(&mut self, _indices: &[u32]) -> anyhow::Result<BufferHandle> {
            anyhow::bail!("out of device memory")
        }

        fn release(&mut self, handle: BufferHandle) -> anyhow::Result<()> {
            self.0.release(handle)
        }
    }

    #[test]
    fn upload_copies_both_arrays() {
        let (handle, chunk) = meshed_chunk();
        let mut bridge = MemoryUploadBridge::new();

        let uploaded = UploadedMesh::upload(&mut bridge, handle, &chunk).unwrap();

        assert_eq!(uploaded.index_count, 36);
        assert_eq!(bridge.buffer(uploaded.vertex_buffer).unwrap().len(), 24 * 4);
        assert_eq!(bridge.buffer(uploaded.index_buffer).unwrap().len(), 36 * 4);
        assert_eq!(bridge.buffer_kind(uploaded.index_buffer), Some(BufferKind::Index));
        assert_eq!(bridge.get_total_allocated_memory(), (24 + 36) * 4);
        assert_eq!(uploaded.transform, chunk.transform());
    }

    #[test]
    fn release_frees_both_buffers_once() {
        let (handle, chunk) = meshed_chunk();
        let mut bridge = MemoryUploadBridge::new();
        let uploaded = UploadedMesh::upload(&mut bridge, handle, &chunk).unwrap();

        uploaded.release(&mut bridge).unwrap();
        assert_eq!(bridge.live_buffers(), 0);
        assert_eq!(bridge.releases(), 2);
        assert!(uploaded.release(&mut bridge).is_err());
    }

    #[test]
    fn failed_index_upload_releases_the_vertex_buffer() {
        let (handle, chunk) = meshed_chunk();
        let mut bridge = RejectIndices(MemoryUploadBridge::new());

        assert!(UploadedMesh::upload(&mut bridge, handle, &chunk).is_err());
        assert_eq!(bridge.0.uploads(), 1);
        assert_eq!(bridge.0.live_buffers(), 0);
    }
}
