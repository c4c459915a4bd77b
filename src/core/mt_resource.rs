//! Shared, lock-guarded ownership of values handed between threads.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted handle to a value guarded by a read-write lock.
///
/// Chunks are published from worker threads into the registry as `MtResource<Chunk>`.
/// After publication the main thread holds clones of the same handle, so every clone
/// observes the same chunk: reads go through [`MtResource::get`] and lifecycle updates
/// such as marking a chunk loaded go through [`MtResource::get_mut`].
///
/// A worker that panics while holding the write guard poisons the lock. The data inside
/// a chunk is only ever written before publication, so a poisoned lock still holds a
/// consistent value and the guard is recovered instead of propagating the panic.
///
/// # Examples
///
/// ```
/// use voxel_chunk_pipeline::core::MtResource;
///
/// let counter = MtResource::new(0);
/// let shared = counter.clone();
///
/// std::thread::spawn(move || {
///     *shared.get_mut() += 1;
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(*counter.get(), 1);
/// ```
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Wraps `resource` in a new shared handle.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read guard over the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a write guard over the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

impl<T: Send + Sync + std::fmt::Debug> std::fmt::Debug for MtResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MtResource")
            .field("strong_count", &Arc::strong_count(&self.resource))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_value() {
        let original = MtResource::new(vec![1, 2, 3]);
        let clone = original.clone();

        clone.get_mut().push(4);

        assert!(original.ptr_eq(&clone));
        assert_eq!(original.get().len(), 4);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let resource = MtResource::new(7);
        let poisoner = resource.clone();

        let result = std::thread::spawn(move || {
            let _guard = poisoner.get_mut();
            panic!("poison the lock");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(*resource.get(), 7);
    }
}
