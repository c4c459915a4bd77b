//! # Engine State Module
//!
//! Ties the pipeline together around a [`WorldContext`].
//!
//! ## Key Components
//!
//! * `config` - Engine tunables loaded from JSON
//! * `rendering` - Packed vertices, the mesher, GPU upload and debug bounds
//! * `task_management` - The worker pool
//! * `voxels` - Blocks, chunks, noise and the chunk registry
//!
//! ## Architecture
//!
//! A `WorldContext` is passed explicitly to whatever drives the frame loop.
//! It owns the worker pool and the render scene, and shares the chunk registry
//! and noise field with the generation tasks through `Arc`s. There is no global
//! engine state.
//!
//! ## Frame Flow
//!
//! [`WorldContext::update_frame`] never waits on generation. Each call:
//!
//! 1. requests the chunks around the camera that are neither present nor queued
//! 2. evicts chunks that fell out of range or over capacity, releasing their buffers
//! 3. uploads every published chunk that is meshed, non-empty and not loaded yet

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use cgmath::{Point3, Vector3};
use web_time::{Duration, Instant};

use config::{EngineConfig, EVICTION_MARGIN};
use rendering::{ChunkBounds, UploadBridge, UploadedMesh};
use task_management::WorkerPool;
use voxels::{
    chunk::CHUNK_DIMENSION,
    noise_field::{noise_field_for, NoiseField},
    tasks::ChunkGenerationTask,
    world::{ChunkRegistry, GeneratedChunk, GenerationStats},
};

pub mod config;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// What one [`WorldContext::update_frame`] call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Chunk the camera is in
    pub camera_chunk: Point3<i32>,
    /// Coordinates newly enqueued this frame
    pub requested: usize,
    /// Chunk meshes uploaded this frame
    pub uploaded: usize,
    /// Chunk uploads that failed and will be retried
    pub upload_failures: usize,
    /// Chunks evicted this frame
    pub evicted: usize,
    /// Chunks in the registry after the frame
    pub resident: usize,
    /// Meshes in the render scene after the frame
    pub scene_meshes: usize,
}

/// The chunk coordinate containing a world-space point.
pub fn camera_chunk_from_world(position: Point3<f32>) -> Point3<i32> {
    let edge = CHUNK_DIMENSION as f32;
    Point3::new(
        (position.x / edge).floor() as i32,
        (position.y / edge).floor() as i32,
        (position.z / edge).floor() as i32,
    )
}

/// The registry, worker pool and render scene of one world.
///
/// # Examples
///
/// ```ignore
/// let mut world = WorldContext::new(EngineConfig::default())?;
/// let mut bridge = MemoryUploadBridge::new();
///
/// loop {
///     let report = world.update_frame(camera_position, &mut bridge)?;
///     // draw world.scene()
/// }
/// ```
pub struct WorldContext {
    config: EngineConfig,
    registry: Arc<ChunkRegistry>,
    noise: Arc<dyn NoiseField>,
    pool: WorkerPool,
    /// Offsets scanned by each request pass
    request_offsets: Vec<Vector3<i32>>,
    /// Uploaded meshes by chunk coordinate
    scene: HashMap<Point3<i32>, UploadedMesh>,
}

impl WorldContext {
    /// Builds a world using the noise field selected by the config.
    ///
    /// # Returns
    /// An error if the config is invalid or the pool cannot start.
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let noise: Arc<dyn NoiseField> = Arc::from(noise_field_for(&config)?);
        Self::with_noise_field(config, noise)
    }

    /// Builds a world around a caller-provided noise field.
    pub fn with_noise_field(
        config: EngineConfig,
        noise: Arc<dyn NoiseField>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let threads = WorkerPool::resolve_thread_count(config.worker_threads);
        let pool = WorkerPool::start(threads)?;

        log::info!(
            "World ready: {:?} generation, seed {}, threshold {}, {} workers",
            config.generation_method,
            config.seed,
            config.threshold,
            threads
        );

        let request_offsets = config.request_offsets();
        Ok(WorldContext {
            config,
            registry: Arc::new(ChunkRegistry::new()),
            noise,
            pool,
            request_offsets,
            scene: HashMap::new(),
        })
    }

    /// Requests generation of one chunk.
    ///
    /// # Returns
    /// `true` if the coordinate was newly queued, `false` if it was already
    /// pending, in flight, generated, or failed.
    pub fn request_chunk(&self, position: Point3<i32>) -> anyhow::Result<bool> {
        if !self.registry.enqueue(position) {
            return Ok(false);
        }
        let task = ChunkGenerationTask::new(
            self.registry.clone(),
            self.noise.clone(),
            self.config.threshold,
        );
        if let Err(error) = self.pool.submit(Box::new(task)) {
            self.registry.cancel_pending(position);
            return Err(error);
        }
        Ok(true)
    }

    /// Requests every chunk near `center` that is neither present nor queued.
    ///
    /// Covers [`EngineConfig::request_offsets`] around the centre. Present
    /// chunks in that range are marked recently used.
    ///
    /// # Returns
    /// The number of newly queued coordinates.
    pub fn request_chunks_around(&self, center: Point3<i32>) -> anyhow::Result<usize> {
        let mut requested = 0;

        for offset in &self.request_offsets {
            let position = center + *offset;
            if self.registry.contains(position) {
                self.registry.touch(position);
                continue;
            }
            if self.request_chunk(position)? {
                requested += 1;
            }
        }

        if requested > 0 {
            log::debug!("Requested {requested} chunks around {center:?}");
        }
        Ok(requested)
    }

    /// Uploads every published chunk that is meshed, non-empty and not yet
    /// loaded, and marks it loaded.
    ///
    /// A failed upload is logged and retried on the next call.
    ///
    /// # Returns
    /// `(uploaded, failed)` counts.
    pub fn upload_generated(&mut self, bridge: &mut dyn UploadBridge) -> (usize, usize) {
        let mut uploaded = 0;
        let mut failed = 0;

        for GeneratedChunk {
            handle,
            position,
            chunk,
        } in self.registry.get_all_generated()
        {
            let result = {
                let chunk = chunk.get();
                if chunk.is_loaded() || chunk.is_empty() || !chunk.is_meshed() {
                    continue;
                }
                UploadedMesh::upload(bridge, handle, &chunk)
            };

            match result {
                Ok(mesh) => {
                    chunk.get_mut().set_loaded(true);
                    self.scene.insert(position, mesh);
                    uploaded += 1;
                }
                Err(error) => {
                    log::error!("Upload failed: {error:#}");
                    failed += 1;
                }
            }
        }

        if uploaded > 0 {
            log::trace!("Uploaded {uploaded} chunk meshes");
        }
        (uploaded, failed)
    }

    /// Evicts chunks farther than the render distance plus margin from `center`,
    /// then enforces the resident chunk limit. Scene meshes of evicted chunks
    /// are released through `bridge`.
    ///
    /// # Returns
    /// The number of evicted chunks.
    pub fn evict(&mut self, center: Point3<i32>, bridge: &mut dyn UploadBridge) -> usize {
        let mut evicted = self
            .registry
            .evict_beyond(center, self.config.render_distance + EVICTION_MARGIN);
        evicted.extend(self.registry.enforce_capacity(self.config.max_resident_chunks));

        for chunk in &evicted {
            if let Some(mesh) = self.scene.remove(&chunk.position) {
                if let Err(error) = mesh.release(bridge) {
                    log::warn!(
                        "Releasing mesh of chunk {:?} failed: {error:#}",
                        chunk.position
                    );
                }
            }
        }
        evicted.len()
    }

    /// Runs one frame of chunk streaming for a camera at `camera_position`.
    pub fn update_frame(
        &mut self,
        camera_position: Point3<f32>,
        bridge: &mut dyn UploadBridge,
    ) -> anyhow::Result<FrameReport> {
        let camera_chunk = camera_chunk_from_world(camera_position);

        let requested = self.request_chunks_around(camera_chunk)?;
        let evicted = self.evict(camera_chunk, bridge);
        let (uploaded, upload_failures) = self.upload_generated(bridge);

        Ok(FrameReport {
            camera_chunk,
            requested,
            uploaded,
            upload_failures,
            evicted,
            resident: self.registry.generated_len(),
            scene_meshes: self.scene.len(),
        })
    }

    /// Blocks until nothing is pending or in flight, or `timeout` passes.
    ///
    /// For drivers and tests; the frame loop itself never waits.
    ///
    /// # Returns
    /// `true` if the registry went idle in time.
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        while !self.registry.is_idle() {
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Releases every scene mesh through `bridge`.
    pub fn release_scene(&mut self, bridge: &mut dyn UploadBridge) {
        for (position, mesh) in self.scene.drain() {
            if let Err(error) = mesh.release(bridge) {
                log::warn!("Releasing mesh of chunk {position:?} failed: {error:#}");
            }
        }
    }

    /// Stops the worker pool. Queued generation is dropped.
    pub fn stop(&mut self) {
        self.pool.stop();
    }

    /// Uploaded meshes by chunk coordinate.
    pub fn scene(&self) -> &HashMap<Point3<i32>, UploadedMesh> {
        &self.scene
    }

    /// Bounding boxes of every mesh in the scene, for the debug overlay.
    pub fn debug_bounds(&self) -> Vec<ChunkBounds> {
        self.scene
            .keys()
            .map(|position| ChunkBounds::for_chunk(*position))
            .collect()
    }

    /// The shared chunk registry.
    pub fn registry(&self) -> &Arc<ChunkRegistry> {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generation counters so far.
    pub fn stats(&self) -> GenerationStats {
        self.registry.stats()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.thread_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        config::GenerationMethod, rendering::MemoryUploadBridge,
        voxels::world::chunk_distance_squared,
    };

    fn config(method: GenerationMethod) -> EngineConfig {
        EngineConfig {
            worker_threads: Some(2),
            render_distance: 2,
            render_distance_y: 1,
            generation_method: method,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn camera_chunk_uses_floor_division() {
        assert_eq!(
            camera_chunk_from_world(Point3::new(0.0, 31.9, 32.0)),
            Point3::new(0, 0, 1)
        );
        assert_eq!(
            camera_chunk_from_world(Point3::new(-0.5, -32.0, -33.0)),
            Point3::new(-1, -1, -2)
        );
    }

    #[test]
    fn request_pass_respects_the_distance_limit() {
        let world = WorldContext::new(config(GenerationMethod::Empty)).unwrap();
        let center = Point3::new(0, 0, 0);

        let requested = world.request_chunks_around(center).unwrap();
        // rd = 2, rdy = 1: offsets in [-2,2) x [-1,1) x [-2,2) with |d|^2 <= 4.
        let mut expected = 0;
        for x in -2..2 {
            for y in -1..1 {
                for z in -2..2 {
                    if x * x + y * y + z * z <= 4 {
                        expected += 1;
                    }
                }
            }
        }
        assert_eq!(requested, expected);
        assert_eq!(world.request_chunks_around(center).unwrap(), 0);
    }

    #[test]
    fn solid_world_uploads_every_requested_chunk() {
        let mut world = WorldContext::new(config(GenerationMethod::Solid)).unwrap();
        let mut bridge = MemoryUploadBridge::new();
        let camera = Point3::new(1.0, 1.0, 1.0);

        let first = world.update_frame(camera, &mut bridge).unwrap();
        assert!(first.requested > 0);
        assert!(world.wait_for_idle(Duration::from_secs(30)));

        let second = world.update_frame(camera, &mut bridge).unwrap();
        assert_eq!(second.requested, 0);
        assert_eq!(first.uploaded + second.uploaded, first.requested);
        assert_eq!(world.scene().len(), first.requested);
        assert_eq!(bridge.live_buffers(), 2 * first.requested);
        assert_eq!(world.debug_bounds().len(), first.requested);

        for mesh in world.scene().values() {
            assert_eq!(mesh.index_count, 6144 * 6);
        }
    }

    #[test]
    fn empty_world_uploads_nothing() {
        let mut world = WorldContext::new(config(GenerationMethod::Empty)).unwrap();
        let mut bridge = MemoryUploadBridge::new();
        let camera = Point3::new(0.0, 0.0, 0.0);

        let first = world.update_frame(camera, &mut bridge).unwrap();
        assert!(world.wait_for_idle(Duration::from_secs(30)));
        world.update_frame(camera, &mut bridge).unwrap();

        assert!(world.scene().is_empty());
        assert_eq!(world.stats().empty as usize, first.requested);
        assert_eq!(bridge.uploads(), 0);
    }

    #[test]
    fn moving_away_evicts_and_releases_buffers() {
        let mut world = WorldContext::new(config(GenerationMethod::Solid)).unwrap();
        let mut bridge = MemoryUploadBridge::new();

        world.update_frame(Point3::new(0.0, 0.0, 0.0), &mut bridge).unwrap();
        assert!(world.wait_for_idle(Duration::from_secs(30)));
        world.update_frame(Point3::new(0.0, 0.0, 0.0), &mut bridge).unwrap();
        let before = world.scene().len();
        assert!(before > 0);

        let far = Point3::new(100.0 * CHUNK_DIMENSION as f32, 0.0, 0.0);
        let report = world.update_frame(far, &mut bridge).unwrap();

        assert_eq!(report.evicted, before);
        assert!(world
            .scene()
            .keys()
            .all(|p| chunk_distance_squared(*p, report.camera_chunk) <= 16));
        assert_eq!(bridge.releases() as usize, 2 * before);

        world.stop();
    }

    #[test]
    fn stopped_world_rejects_requests() {
        let mut world = WorldContext::new(config(GenerationMethod::Empty)).unwrap();
        world.stop();

        let position = Point3::new(9, 9, 9);
        assert!(world.request_chunk(position).is_err());
        assert!(!world.registry().is_queued(position));
        assert!(world.registry().is_idle());
    }
}
