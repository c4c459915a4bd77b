//! # Engine Configuration
//!
//! Tunables for world generation and streaming, loaded from JSON. Every field
//! has a default, so a config file only needs the values it changes:
//!
//! ```json
//! { "seed": 42, "threshold": 0.2, "worker_threads": 4 }
//! ```
//!
//! Invalid values are rejected by [`EngineConfig::validate`] before any thread
//! is started.

use std::{fs, path::Path};

use anyhow::{ensure, Context};
use cgmath::Vector3;
use serde::{Deserialize, Serialize};

/// Extra chunks beyond the render distance kept before eviction.
pub const EVICTION_MARGIN: i32 = 2;

/// Largest accepted render distance, horizontal or vertical.
pub const MAX_RENDER_DISTANCE: i32 = 1024;

/// How chunk densities are produced.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    /// Coherent Perlin noise terrain
    #[default]
    Perlin,
    /// Every voxel solid
    Solid,
    /// Every voxel air
    Empty,
    /// Alternating solid and air voxels
    Checkerboard,
}

/// Configuration for a [`WorldContext`](super::WorldContext).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Noise seed
    pub seed: u32,
    /// Scale applied to world coordinates before sampling noise
    pub frequency: f64,
    /// Samples at or above this value are air
    pub threshold: f32,
    /// Worker count; `None` uses the available hardware parallelism
    pub worker_threads: Option<usize>,
    /// Horizontal request radius in chunks
    pub render_distance: i32,
    /// Vertical request radius in chunks
    pub render_distance_y: i32,
    /// Upper bound on chunks kept in the registry
    pub max_resident_chunks: usize,
    /// Density source
    pub generation_method: GenerationMethod,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            seed: 1337,
            frequency: 0.02,
            threshold: 0.12,
            worker_threads: None,
            render_distance: 4,
            render_distance_y: 2,
            max_resident_chunks: 4096,
            generation_method: GenerationMethod::Perlin,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a JSON config string.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the config back to pretty JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.worker_threads != Some(0),
            "worker_threads must be at least 1"
        );
        ensure!(
            self.threshold.is_finite(),
            "threshold must be finite, got {}",
            self.threshold
        );
        ensure!(
            self.frequency.is_finite() && self.frequency > 0.0,
            "frequency must be positive and finite, got {}",
            self.frequency
        );
        ensure!(
            self.render_distance >= 0 && self.render_distance_y >= 0,
            "render distances must not be negative, got {} and {}",
            self.render_distance,
            self.render_distance_y
        );
        ensure!(
            self.render_distance <= MAX_RENDER_DISTANCE
                && self.render_distance_y <= MAX_RENDER_DISTANCE,
            "render distances must be at most {MAX_RENDER_DISTANCE}, got {} and {}",
            self.render_distance,
            self.render_distance_y
        );
        ensure!(
            self.max_resident_chunks > 0,
            "max_resident_chunks must be at least 1"
        );

        // Capacity eviction must never drop chunks the request pass keeps asking for.
        let request_area = self.request_offsets().len();
        ensure!(
            self.max_resident_chunks >= request_area,
            "max_resident_chunks must hold the {request_area} chunks requested around the camera, got {}",
            self.max_resident_chunks
        );
        Ok(())
    }

    /// Offsets from the camera chunk covered by the request pass.
    ///
    /// Spans `[-rd, rd) × [-rdy, rdy) × [-rd, rd)` and keeps offsets whose
    /// squared length is at most `rd + EVICTION_MARGIN`. Ordered x, then y,
    /// then z.
    pub fn request_offsets(&self) -> Vec<Vector3<i32>> {
        let rd = self.render_distance.clamp(0, MAX_RENDER_DISTANCE);
        let rdy = self.render_distance_y.clamp(0, MAX_RENDER_DISTANCE);
        let limit = (rd + EVICTION_MARGIN) as i64;
        // No offset component can exceed sqrt(limit).
        let reach = (limit as f64).sqrt() as i32;

        let mut offsets = Vec::new();
        for x in (-rd).max(-reach)..rd.min(reach + 1) {
            for y in (-rdy).max(-reach)..rdy.min(reach + 1) {
                for z in (-rd).max(-reach)..rd.min(reach + 1) {
                    let (dx, dy, dz) = (x as i64, y as i64, z as i64);
                    if dx * dx + dy * dy + dz * dz <= limit {
                        offsets.push(Vector3::new(x, y, z));
                    }
                }
            }
        }
        offsets
    }
}
