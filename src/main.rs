//! # Voxel Chunk Pipeline Entry Point
//!
//! Runs the pipeline headless: a camera flies over the terrain while chunks are
//! generated, meshed and uploaded to an in-memory bridge.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- [config.json] [frames]
//! ```

use anyhow::Context;
use voxel_chunk_pipeline::EngineConfig;

const DEFAULT_FRAMES: usize = 240;

fn main() -> anyhow::Result<()> {
    voxel_chunk_pipeline::init_logging();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };
    let frames = match args.next() {
        Some(frames) => frames
            .parse()
            .with_context(|| format!("invalid frame count {frames:?}"))?,
        None => DEFAULT_FRAMES,
    };

    let summary = voxel_chunk_pipeline::run_headless(config, frames)?;
    println!(
        "{} frames in {:?}: {} chunks generated, {} meshes resident, {} bytes uploaded",
        summary.frames,
        summary.elapsed,
        summary.stats.generated,
        summary.scene_meshes,
        summary.allocated_bytes
    );
    Ok(())
}
