//! # Voxel World
//!
//! Block data, chunks, and the registry that schedules and owns them.
//!
//! ## Architecture
//!
//! * **Block**: per-voxel materials and the six voxel faces
//! * **Chunk**: a fixed-size cube of voxels with its mesh and lifecycle flags
//! * **Noise Field**: density sources that chunks are thresholded from
//! * **World**: the chunk registry, generation queue and eviction
//! * **Tasks**: the generation work run on the worker pool
//!
//! ## Data Flow
//!
//! 1. The frame loop enqueues chunk coordinates in the registry
//! 2. A generation task claims a coordinate on a worker thread
//! 3. The task samples noise, thresholds it into a block grid and meshes it
//! 4. The finished chunk is published into the registry
//! 5. The frame loop picks up published chunks and uploads their meshes
//!
//! ## Thread Safety
//!
//! * A chunk is only written by the worker that generates it, before publication
//! * The registry serializes every queue and index update behind one mutex
//! * Noise fields are `Send + Sync` and pure

pub mod block;
pub mod chunk;
pub mod noise_field;
pub mod tasks;
pub mod world;
