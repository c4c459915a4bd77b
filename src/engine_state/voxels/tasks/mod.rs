//! # Voxel Task System
//!
//! Work units run on the worker pool for world generation.

pub mod chunk_generation_task;

pub use chunk_generation_task::ChunkGenerationTask;
