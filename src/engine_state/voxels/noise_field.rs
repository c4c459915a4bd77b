//! # Noise Field Module
//!
//! Sources of per-voxel density for chunk generation. A [`NoiseField`] turns a
//! chunk origin into N³ samples laid out exactly like a
//! [`BlockGrid`](super::chunk::block_grid::BlockGrid): x fastest, then y, then z.
//! The generator thresholds those samples, so every field is interchangeable.
//!
//! Fields are shared by all worker threads, hence `Send + Sync`, and must be
//! pure: the same origin always yields the same samples.

use anyhow::ensure;
use cgmath::Point3;
use noise::{NoiseFn, Perlin};

use crate::engine_state::config::{EngineConfig, GenerationMethod};

/// Produces the density samples for one chunk.
pub trait NoiseField: Send + Sync {
    /// Samples an `dimension`³ block of voxels starting at `origin`.
    ///
    /// # Arguments
    /// * `origin` - World-space voxel coordinate of the block's (0, 0, 0) corner
    /// * `dimension` - Edge length in voxels
    ///
    /// # Returns
    /// `dimension`³ samples, x fastest.
    fn sample(&self, origin: Point3<i32>, dimension: usize) -> anyhow::Result<Vec<f32>>;
}

/// Coherent 3D Perlin noise, sampled at voxel centres.
pub struct PerlinNoiseField {
    perlin: Perlin,
    frequency: f64,
}

impl PerlinNoiseField {
    /// Creates a Perlin field.
    ///
    /// # Arguments
    /// * `seed` - Permutation seed
    /// * `frequency` - Scale applied to world coordinates before sampling
    pub fn new(seed: u32, frequency: f64) -> anyhow::Result<Self> {
        ensure!(
            frequency.is_finite() && frequency > 0.0,
            "noise frequency must be positive and finite, got {frequency}"
        );
        Ok(PerlinNoiseField {
            perlin: Perlin::new(seed),
            frequency,
        })
    }

    /// Maps a world voxel coordinate to the centre point fed to the noise.
    fn to_perlin_pos(&self, x: i32, y: i32, z: i32) -> [f64; 3] {
        [
            (x as f64 + 0.5) * self.frequency,
            (y as f64 + 0.5) * self.frequency,
            (z as f64 + 0.5) * self.frequency,
        ]
    }
}

impl NoiseField for PerlinNoiseField {
    fn sample(&self, origin: Point3<i32>, dimension: usize) -> anyhow::Result<Vec<f32>> {
        let edge = i32::try_from(dimension)?;
        let mut samples = Vec::with_capacity(dimension.pow(3));

        for k in 0..edge {
            for j in 0..edge {
                for i in 0..edge {
                    let position = self.to_perlin_pos(origin.x + i, origin.y + j, origin.z + k);
                    samples.push(self.perlin.get(position) as f32);
                }
            }
        }

        Ok(samples)
    }
}

/// The same value everywhere.
///
/// With the usual threshold, `f32::MIN` yields solid chunks and `f32::MAX`
/// yields empty ones.
pub struct ConstantNoiseField {
    value: f32,
}

impl ConstantNoiseField {
    /// Creates a field that always returns `value`.
    pub fn new(value: f32) -> Self {
        ConstantNoiseField { value }
    }
}

impl NoiseField for ConstantNoiseField {
    fn sample(&self, _origin: Point3<i32>, dimension: usize) -> anyhow::Result<Vec<f32>> {
        Ok(vec![self.value; dimension.pow(3)])
    }
}

/// Alternating solid and air voxels in all three axes, in world space so the
/// pattern continues across chunk borders.
pub struct CheckerboardNoiseField;

impl NoiseField for CheckerboardNoiseField {
    fn sample(&self, origin: Point3<i32>, dimension: usize) -> anyhow::Result<Vec<f32>> {
        let edge = i32::try_from(dimension)?;
        let mut samples = Vec::with_capacity(dimension.pow(3));

        for k in 0..edge {
            for j in 0..edge {
                for i in 0..edge {
                    let parity = (origin.x + i + origin.y + j + origin.z + k).rem_euclid(2);
                    samples.push(if parity == 0 { f32::MIN } else { f32::MAX });
                }
            }
        }

        Ok(samples)
    }
}

/// Builds the field selected by the configuration.
pub fn noise_field_for(config: &EngineConfig) -> anyhow::Result<Box<dyn NoiseField>> {
    Ok(match config.generation_method {
        GenerationMethod::Perlin => Box::new(PerlinNoiseField::new(config.seed, config.frequency)?),
        GenerationMethod::Solid => Box::new(ConstantNoiseField::new(f32::MIN)),
        GenerationMethod::Empty => Box::new(ConstantNoiseField::new(f32::MAX)),
        GenerationMethod::Checkerboard => Box::new(CheckerboardNoiseField),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perlin_is_deterministic_for_a_seed() {
        let a = PerlinNoiseField::new(7, 0.05).unwrap();
        let b = PerlinNoiseField::new(7, 0.05).unwrap();
        let origin = Point3::new(-32, 0, 64);

        assert_eq!(a.sample(origin, 8).unwrap(), b.sample(origin, 8).unwrap());
    }

    #[test]
    fn perlin_varies_with_origin() {
        let field = PerlinNoiseField::new(7, 0.05).unwrap();
        let here = field.sample(Point3::new(0, 0, 0), 8).unwrap();
        let there = field.sample(Point3::new(256, 0, 0), 8).unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn samples_follow_grid_order() {
        let field = PerlinNoiseField::new(3, 0.1).unwrap();
        let block = field.sample(Point3::new(0, 0, 0), 4).unwrap();
        let shifted = field.sample(Point3::new(1, 0, 0), 4).unwrap();

        // Moving the origin one voxel along x shifts every row by one sample.
        assert_eq!(block[1], shifted[0]);
        assert_eq!(block[4 + 1], shifted[4]);
        assert_eq!(block.len(), 64);
    }

    #[test]
    fn bad_frequency_is_rejected() {
        assert!(PerlinNoiseField::new(0, 0.0).is_err());
        assert!(PerlinNoiseField::new(0, f64::NAN).is_err());
    }

    #[test]
    fn checkerboard_alternates_on_every_axis() {
        let samples = CheckerboardNoiseField.sample(Point3::new(0, 0, 0), 2).unwrap();
        assert_eq!(
            samples,
            vec![f32::MIN, f32::MAX, f32::MAX, f32::MIN, f32::MAX, f32::MIN, f32::MIN, f32::MAX]
        );
    }

    #[test]
    fn generation_method_selects_the_field() {
        let mut config = EngineConfig::default();
        config.generation_method = GenerationMethod::Empty;
        let samples = noise_field_for(&config)
            .unwrap()
            .sample(Point3::new(0, 0, 0), 2)
            .unwrap();
        assert!(samples.iter().all(|s| *s >= config.threshold));
    }
}
