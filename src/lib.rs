#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Chunk Pipeline
//!
//! Procedural voxel terrain generation and face-culled meshing, run on a
//! worker pool and streamed around a moving camera.
//!
//! ## Key Modules
//!
//! * `core` - Shared utilities used throughout the pipeline
//! * `engine_state` - Chunk generation, meshing, the chunk registry, the worker
//!   pool and the GPU upload boundary
//!
//! ## Architecture
//!
//! Workers sample a [`NoiseField`](engine_state::voxels::noise_field::NoiseField),
//! threshold it into a block grid and mesh the grid into packed vertices. The
//! finished chunk is published to the
//! [`ChunkRegistry`](engine_state::voxels::world::ChunkRegistry). Once per frame
//! the [`WorldContext`](engine_state::WorldContext) requests chunks near the
//! camera, evicts far ones and uploads new meshes through an
//! [`UploadBridge`](engine_state::rendering::UploadBridge).
//!
//! ## Usage
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     voxel_chunk_pipeline::init_logging();
//!     let summary = voxel_chunk_pipeline::run_headless(EngineConfig::default(), 120)?;
//!     println!("{summary:?}");
//!     Ok(())
//! }
//! ```

use cgmath::Point3;
use log::info;
use web_time::{Duration, Instant};

pub mod core;
pub mod engine_state;

pub use engine_state::{
    config::{EngineConfig, GenerationMethod},
    rendering::{MemoryUploadBridge, UploadBridge},
    voxels::world::GenerationStats,
    FrameReport, WorldContext,
};

/// World units the headless camera moves along +X each frame.
pub const HEADLESS_CAMERA_SPEED: f32 = 4.0;

/// How long the headless driver waits for generation to drain at the end.
pub const HEADLESS_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Installs the stdout logger, filtered by `RUST_LOG`.
///
/// Calling it again is a no-op.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    if log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok()
    {
        info!("Logger initialized");
    }
}

/// Outcome of a headless run.
#[derive(Clone, Debug)]
pub struct HeadlessSummary {
    /// Frames simulated
    pub frames: usize,
    /// Generation counters at the end of the run
    pub stats: GenerationStats,
    /// Meshes in the scene at the end of the run
    pub scene_meshes: usize,
    /// Buffers still held by the bridge
    pub live_buffers: usize,
    /// Bytes still held by the bridge
    pub allocated_bytes: u64,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

/// Streams chunks around a camera flying along +X for `frames` frames, using
/// an in-memory upload bridge in place of a GPU.
///
/// After the last frame the driver waits for outstanding generation, uploads
/// what finished, and reports the totals.
pub fn run_headless(config: EngineConfig, frames: usize) -> anyhow::Result<HeadlessSummary> {
    let start = Instant::now();
    let mut world = WorldContext::new(config)?;
    let mut bridge = MemoryUploadBridge::new();
    let mut camera = Point3::new(0.0, 0.0, 0.0);

    for frame in 0..frames {
        let report = world.update_frame(camera, &mut bridge)?;
        log::trace!("Frame {frame}: {report:?}");
        camera.x += HEADLESS_CAMERA_SPEED;
    }

    if !world.wait_for_idle(HEADLESS_DRAIN_TIMEOUT) {
        log::warn!("Generation still busy after {HEADLESS_DRAIN_TIMEOUT:?}");
    }
    world.upload_generated(&mut bridge);
    world.stop();

    let stats = world.stats();
    info!(
        "Generated {} chunks ({} empty, {} failed, {} evicted), average {:?}, slowest {:?}",
        stats.generated,
        stats.empty,
        stats.failed,
        stats.evicted,
        stats.average_generation_time(),
        stats.slowest_generation
    );

    Ok(HeadlessSummary {
        frames,
        stats,
        scene_meshes: world.scene().len(),
        live_buffers: bridge.live_buffers(),
        allocated_bytes: bridge.get_total_allocated_memory(),
        elapsed: start.elapsed(),
    })
}
