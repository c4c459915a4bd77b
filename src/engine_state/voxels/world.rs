//! # World Module
//!
//! The [`ChunkRegistry`] owns every generated chunk and schedules generation.
//!
//! ## Architecture
//!
//! Chunks live in an arena of slots addressed by [`ChunkHandle`]. A handle is a
//! slot index plus the slot's generation counter, so a handle to an evicted
//! chunk stops resolving instead of silently pointing at whatever reuses the
//! slot. A hash map from chunk coordinate to handle answers existence queries.
//!
//! Generation requests move through three disjoint stages:
//!
//! 1. **pending**: enqueued, waiting for a worker
//! 2. **in flight**: claimed by exactly one worker
//! 3. **generated**: published into the arena
//!
//! A coordinate is in at most one stage at a time, which is what guarantees a
//! chunk is generated at most once. A coordinate whose generation failed is
//! parked in a separate failed set and is never retried.
//!
//! ## Thread Safety
//!
//! All state sits behind one mutex. Workers claim and publish through it, the
//! main thread enqueues and snapshots through it, and publication is the single
//! hand-off point for a chunk's data. Lock hold times are short: no generation
//! or meshing work runs while the lock is held.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{bail, ensure};
use cgmath::{EuclideanSpace, Point3};
use lru::LruCache;
use web_time::Duration;

use crate::core::MtResource;
use crate::engine_state::voxels::block::{block_side::BlockSide, Material};
use crate::engine_state::voxels::chunk::{Chunk, CHUNK_DIMENSION};

/// Stable reference to a published chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    index: u32,
    generation: u32,
}

impl ChunkHandle {
    /// Arena slot the chunk occupies.
    pub fn index(self) -> u32 {
        self.index
    }
}

/// A published chunk as seen in a registry snapshot.
#[derive(Clone, Debug)]
pub struct GeneratedChunk {
    /// Handle the chunk was published under
    pub handle: ChunkHandle,
    /// Chunk coordinate
    pub position: Point3<i32>,
    /// The chunk itself
    pub chunk: MtResource<Chunk>,
}

/// Counters describing generation so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationStats {
    /// Chunks published, empty ones included
    pub generated: u64,
    /// Published chunks with no solid voxel
    pub empty: u64,
    /// Coordinates whose generation failed
    pub failed: u64,
    /// Chunks removed by eviction
    pub evicted: u64,
    /// Worker time spent generating and meshing published chunks
    pub total_generation_time: Duration,
    /// Longest single generation
    pub slowest_generation: Duration,
}

impl GenerationStats {
    /// Mean time per published chunk.
    pub fn average_generation_time(&self) -> Duration {
        if self.generated == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_generation_time.as_nanos() / u128::from(self.generated);
        u64::try_from(nanos).map_or(Duration::MAX, Duration::from_nanos)
    }
}

struct Slot {
    generation: u32,
    chunk: Option<MtResource<Chunk>>,
}

struct RegistryState {
    pending: VecDeque<Point3<i32>>,
    pending_set: HashSet<Point3<i32>>,
    in_flight: HashSet<Point3<i32>>,
    failed: HashSet<Point3<i32>>,
    index: HashMap<Point3<i32>, ChunkHandle>,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    /// Least recently used generated chunks, for capacity eviction
    least_recently_used: LruCache<Point3<i32>, ()>,
    stats: GenerationStats,
}

impl RegistryState {
    fn resolve(&self, handle: ChunkHandle) -> Option<MtResource<Chunk>> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.chunk.clone()
    }

    fn allocate(&mut self, chunk: MtResource<Chunk>) -> ChunkHandle {
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.slots[index as usize];
            slot.chunk = Some(chunk);
            ChunkHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                chunk: Some(chunk),
            });
            ChunkHandle {
                index,
                generation: 0,
            }
        }
    }

    fn remove(&mut self, position: Point3<i32>) -> Option<GeneratedChunk> {
        let handle = self.index.remove(&position)?;
        self.least_recently_used.pop(&position);

        let slot = &mut self.slots[handle.index as usize];
        let chunk = slot.chunk.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(handle.index);
        self.stats.evicted += 1;

        Some(GeneratedChunk {
            handle,
            position,
            chunk,
        })
    }
}

/// Owns all generated chunks and the generation queue.
pub struct ChunkRegistry {
    state: Mutex<RegistryState>,
}

impl ChunkRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ChunkRegistry {
            state: Mutex::new(RegistryState {
                pending: VecDeque::new(),
                pending_set: HashSet::new(),
                in_flight: HashSet::new(),
                failed: HashSet::new(),
                index: HashMap::new(),
                slots: Vec::new(),
                free_slots: Vec::new(),
                least_recently_used: LruCache::unbounded(),
                stats: GenerationStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a coordinate to the pending queue.
    ///
    /// # Returns
    /// `true` if the coordinate was queued; `false` if it is already pending,
    /// in flight, generated, or has failed before.
    pub fn enqueue(&self, position: Point3<i32>) -> bool {
        let mut state = self.lock();
        if state.pending_set.contains(&position)
            || state.in_flight.contains(&position)
            || state.index.contains_key(&position)
            || state.failed.contains(&position)
        {
            return false;
        }

        state.pending_set.insert(position);
        state.pending.push_back(position);
        true
    }

    /// Whether the coordinate is waiting for or undergoing generation.
    pub fn is_queued(&self, position: Point3<i32>) -> bool {
        let state = self.lock();
        state.pending_set.contains(&position) || state.in_flight.contains(&position)
    }

    /// Whether a chunk has been published at the coordinate.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        self.lock().index.contains_key(&position)
    }

    /// Whether generation at the coordinate failed.
    pub fn is_failed(&self, position: Point3<i32>) -> bool {
        self.lock().failed.contains(&position)
    }

    /// Withdraws a coordinate that is still waiting for a worker.
    ///
    /// # Returns
    /// `true` if the coordinate was pending.
    pub fn cancel_pending(&self, position: Point3<i32>) -> bool {
        let mut state = self.lock();
        if !state.pending_set.remove(&position) {
            return false;
        }
        state.pending.retain(|queued| *queued != position);
        true
    }

    /// Moves the oldest pending coordinate to the in-flight set.
    ///
    /// # Returns
    /// The claimed coordinate, or `None` if nothing is pending.
    pub fn claim_next(&self) -> Option<Point3<i32>> {
        let mut state = self.lock();
        let position = state.pending.pop_front()?;
        state.pending_set.remove(&position);
        state.in_flight.insert(position);
        Some(position)
    }

    /// Publishes a generated chunk claimed with [`ChunkRegistry::claim_next`].
    ///
    /// # Arguments
    /// * `chunk` - The generated (and, if not empty, meshed) chunk
    /// * `elapsed` - Time the worker spent on it
    ///
    /// # Returns
    /// The chunk's handle. Errors if the coordinate was not in flight.
    pub fn publish(&self, chunk: Chunk, elapsed: Duration) -> anyhow::Result<ChunkHandle> {
        let position = chunk.position();
        let empty = chunk.is_empty();

        let mut state = self.lock();
        ensure!(
            state.in_flight.remove(&position),
            "chunk {position:?} was published without being claimed"
        );
        if state.index.contains_key(&position) {
            bail!("chunk {position:?} is already published");
        }

        let handle = state.allocate(MtResource::new(chunk));
        state.index.insert(position, handle);
        state.least_recently_used.push(position, ());

        let stats = &mut state.stats;
        stats.generated += 1;
        if empty {
            stats.empty += 1;
        }
        stats.total_generation_time += elapsed;
        stats.slowest_generation = stats.slowest_generation.max(elapsed);

        Ok(handle)
    }

    /// Gives up on an in-flight coordinate after its generation failed.
    ///
    /// The coordinate moves to the failed set; later enqueues are no-ops.
    pub fn abandon(&self, position: Point3<i32>) {
        let mut state = self.lock();
        if state.in_flight.remove(&position) {
            state.failed.insert(position);
            state.stats.failed += 1;
        }
    }

    /// The handle of the chunk at the coordinate, once published.
    ///
    /// Returns the same handle on every call until the chunk is evicted.
    pub fn get_chunk(&self, position: Point3<i32>) -> Option<ChunkHandle> {
        self.lock().index.get(&position).copied()
    }

    /// The chunk a handle refers to, if it has not been evicted.
    pub fn resolve(&self, handle: ChunkHandle) -> Option<MtResource<Chunk>> {
        self.lock().resolve(handle)
    }

    /// Shortcut for [`ChunkRegistry::get_chunk`] followed by
    /// [`ChunkRegistry::resolve`].
    pub fn chunk_at(&self, position: Point3<i32>) -> Option<MtResource<Chunk>> {
        let state = self.lock();
        let handle = *state.index.get(&position)?;
        state.resolve(handle)
    }

    /// A consistent snapshot of every published chunk, in slot order.
    pub fn get_all_generated(&self) -> Vec<GeneratedChunk> {
        let state = self.lock();
        let mut chunks: Vec<GeneratedChunk> = state
            .index
            .iter()
            .filter_map(|(position, handle)| {
                state.resolve(*handle).map(|chunk| GeneratedChunk {
                    handle: *handle,
                    position: *position,
                    chunk,
                })
            })
            .collect();
        chunks.sort_by_key(|generated| generated.handle.index);
        chunks
    }

    /// Marks a published chunk as recently used.
    pub fn touch(&self, position: Point3<i32>) {
        self.lock().least_recently_used.promote(&position);
    }

    /// The material next to a chunk-local voxel across one of its sides.
    ///
    /// When the step stays inside the chunk the chunk's own voxel is returned.
    /// When it crosses the boundary the neighbouring chunk is read at the
    /// wrapped position. A neighbour that has not been published reads as
    /// SOLID.
    pub fn block_across(
        &self,
        position: Point3<i32>,
        side: BlockSide,
        local: Point3<i32>,
    ) -> Material {
        let target = local + side.normal();
        let wrapped = Point3::new(
            target.x.rem_euclid(CHUNK_DIMENSION),
            target.y.rem_euclid(CHUNK_DIMENSION),
            target.z.rem_euclid(CHUNK_DIMENSION),
        );
        let chunk_position = if wrapped == target {
            position
        } else {
            position + side.normal()
        };

        match self.chunk_at(chunk_position) {
            Some(chunk) => chunk.get().block_at(wrapped).unwrap_or(Material::SOLID),
            None => Material::SOLID,
        }
    }

    /// Removes every published chunk farther than `radius` chunks from `center`.
    ///
    /// Distance is Euclidean in chunk space, compared squared.
    ///
    /// # Returns
    /// The evicted chunks, so their GPU resources can be released.
    pub fn evict_beyond(&self, center: Point3<i32>, radius: i32) -> Vec<GeneratedChunk> {
        let mut state = self.lock();
        let radius_squared = (radius as i64).pow(2);
        let far: Vec<Point3<i32>> = state
            .index
            .keys()
            .copied()
            .filter(|position| chunk_distance_squared(*position, center) > radius_squared)
            .collect();

        let evicted: Vec<GeneratedChunk> = far
            .into_iter()
            .filter_map(|position| state.remove(position))
            .collect();
        if !evicted.is_empty() {
            log::debug!("Evicted {} chunks beyond radius {}", evicted.len(), radius);
        }
        evicted
    }

    /// Evicts least recently used chunks until at most `max` remain.
    pub fn enforce_capacity(&self, max: usize) -> Vec<GeneratedChunk> {
        let mut state = self.lock();
        let mut evicted = Vec::new();
        while state.index.len() > max {
            let Some((position, _)) = state.least_recently_used.pop_lru() else {
                break;
            };
            if let Some(chunk) = state.remove(position) {
                evicted.push(chunk);
            }
        }
        if !evicted.is_empty() {
            log::debug!("Evicted {} chunks over capacity {}", evicted.len(), max);
        }
        evicted
    }

    /// A copy of the generation counters.
    pub fn stats(&self) -> GenerationStats {
        self.lock().stats.clone()
    }

    /// Coordinates waiting for a worker.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Coordinates claimed by a worker.
    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Published chunks.
    pub fn generated_len(&self) -> usize {
        self.lock().index.len()
    }

    /// `true` when nothing is pending or in flight.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.pending.is_empty() && state.in_flight.is_empty()
    }
}

impl Default for ChunkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Squared Euclidean distance between two chunk coordinates.
pub fn chunk_distance_squared(a: Point3<i32>, b: Point3<i32>) -> i64 {
    let delta = a.to_vec() - b.to_vec();
    let (x, y, z) = (delta.x as i64, delta.y as i64, delta.z as i64);
    x * x + y * y + z * z
}
