//! # Chunk Generation Task
//!
//! The work a pool worker does for one chunk: claim the next pending
//! coordinate, sample the noise field, threshold it into blocks, mesh the
//! result, and publish the finished chunk into the registry.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use cgmath::Point3;
use web_time::Instant;

use crate::engine_state::{
    task_management::task::Task,
    voxels::{
        chunk::{Chunk, CHUNK_DIMENSION},
        noise_field::NoiseField,
        world::ChunkRegistry,
    },
};

/// Generates whichever coordinate is at the front of the pending queue.
///
/// One task is submitted per accepted enqueue, so every pending coordinate is
/// claimed by exactly one task. If generation fails or panics the coordinate is
/// abandoned in the registry and the error is handed back to the worker, which
/// logs it.
pub struct ChunkGenerationTask {
    /// Where coordinates are claimed from and chunks are published to
    registry: Arc<ChunkRegistry>,
    /// Shared density source
    noise: Arc<dyn NoiseField>,
    /// Samples at or above this are air
    threshold: f32,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `registry` - The registry to claim from and publish to
    /// * `noise` - The density source
    /// * `threshold` - The solid/air cut-off
    pub fn new(registry: Arc<ChunkRegistry>, noise: Arc<dyn NoiseField>, threshold: f32) -> Self {
        ChunkGenerationTask {
            registry,
            noise,
            threshold,
        }
    }

    /// Produces a generated and, unless empty, meshed chunk.
    pub fn build_chunk(
        noise: &dyn NoiseField,
        position: Point3<i32>,
        threshold: f32,
    ) -> anyhow::Result<Chunk> {
        let origin = position * CHUNK_DIMENSION;
        let samples = noise
            .sample(origin, CHUNK_DIMENSION as usize)
            .with_context(|| format!("sampling noise for chunk {position:?}"))?;

        let mut chunk = Chunk::new(position);
        if chunk.generate(&samples, threshold)? {
            chunk.regenerate_mesh()?;
        }
        Ok(chunk)
    }
}

impl Task for ChunkGenerationTask {
    fn name(&self) -> String {
        "chunk generation".to_string()
    }

    fn process(self: Box<Self>) -> anyhow::Result<()> {
        let Some(position) = self.registry.claim_next() else {
            return Ok(());
        };

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            Self::build_chunk(self.noise.as_ref(), position, self.threshold)
        }))
        .unwrap_or_else(|payload| {
            Err(anyhow!(
                "panicked: {}",
                crate::engine_state::task_management::panic_message(payload.as_ref())
            ))
        });

        match outcome {
            Ok(chunk) => {
                let elapsed = start.elapsed();
                let faces = chunk.mesh().face_count();
                let empty = chunk.is_empty();
                self.registry.publish(chunk, elapsed)?;
                log::debug!(
                    "Generated chunk {:?} in {:?} ({})",
                    position,
                    elapsed,
                    if empty {
                        "empty".to_string()
                    } else {
                        format!("{faces} faces")
                    }
                );
                Ok(())
            }
            Err(error) => {
                self.registry.abandon(position);
                Err(error.context(format!("generating chunk {position:?}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::noise_field::ConstantNoiseField;

    struct FailingNoise;

    impl NoiseField for FailingNoise {
        fn sample(&self, _origin: Point3<i32>, _dimension: usize) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("noise backend unavailable")
        }
    }

    struct PanickingNoise;

    impl NoiseField for PanickingNoise {
        fn sample(&self, _origin: Point3<i32>, _dimension: usize) -> anyhow::Result<Vec<f32>> {
            panic!("noise backend exploded")
        }
    }

    fn run(noise: Arc<dyn NoiseField>, position: Point3<i32>) -> (Arc<ChunkRegistry>, anyhow::Result<()>) {
        let registry = Arc::new(ChunkRegistry::new());
        registry.enqueue(position);
        let task = Box::new(ChunkGenerationTask::new(registry.clone(), noise, 0.5));
        let result = task.process();
        (registry, result)
    }

    #[test]
    fn publishes_a_meshed_chunk() {
        let position = Point3::new(0, 0, 0);
        let (registry, result) = run(Arc::new(ConstantNoiseField::new(0.0)), position);
        result.unwrap();

        let chunk = registry.chunk_at(position).unwrap();
        let chunk = chunk.get();
        assert!(chunk.is_meshed());
        assert_eq!(chunk.mesh().face_count(), 6144);
        assert!(registry.is_idle());
        assert_eq!(registry.stats().generated, 1);
    }

    #[test]
    fn publishes_empty_chunks_without_a_mesh() {
        let position = Point3::new(2, 0, 0);
        let (registry, result) = run(Arc::new(ConstantNoiseField::new(1.0)), position);
        result.unwrap();

        let chunk = registry.chunk_at(position).unwrap();
        assert!(chunk.get().is_empty());
        assert!(!chunk.get().is_meshed());
        assert_eq!(registry.stats().empty, 1);
    }

    #[test]
    fn noise_errors_abandon_the_coordinate() {
        let position = Point3::new(1, 1, 1);
        let (registry, result) = run(Arc::new(FailingNoise), position);

        assert!(result.is_err());
        assert!(registry.is_failed(position));
        assert!(registry.chunk_at(position).is_none());
        assert!(registry.is_idle());
    }

    #[test]
    fn noise_panics_abandon_the_coordinate() {
        let position = Point3::new(-1, 0, 0);
        let (registry, result) = run(Arc::new(PanickingNoise), position);

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("noise backend exploded"));
        assert!(registry.is_failed(position));
    }

    #[test]
    fn nothing_pending_is_a_no_op() {
        let registry = Arc::new(ChunkRegistry::new());
        let task = Box::new(ChunkGenerationTask::new(
            registry.clone(),
            Arc::new(ConstantNoiseField::new(0.0)),
            0.5,
        ));
        task.process().unwrap();
        assert_eq!(registry.generated_len(), 0);
    }

    #[test]
    fn chunk_origin_is_scaled_by_edge_length() {
        struct OriginCheck;
        impl NoiseField for OriginCheck {
            fn sample(&self, origin: Point3<i32>, dimension: usize) -> anyhow::Result<Vec<f32>> {
                anyhow::ensure!(origin == Point3::new(32, -64, 0), "origin was {origin:?}");
                Ok(vec![1.0; dimension.pow(3)])
            }
        }

        let chunk = ChunkGenerationTask::build_chunk(&OriginCheck, Point3::new(1, -2, 0), 0.5)
            .unwrap();
        assert!(chunk.is_empty());
    }
}
