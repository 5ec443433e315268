//! [SyncBoundedLru] puts a [BoundedLru] behind a `Mutex` so that it can be shared between threads.
//!
//! The plain cache stays lock-free for the common single-owner case; reach for this only when the cache really is
//! shared.  Every method holds the lock for the whole operation, including any evictions it causes, so no other thread
//! can see the cache part way through a mutation.
//!
//! Lookups hand back clones.  For large values, store `Arc<T>` so that a clone is just a reference count bump.
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

use crate::*;

pub struct SyncBoundedLru<K: Hash + Eq, V> {
    inner: Mutex<BoundedLru<K, V>>,
}

impl<K: Hash + Eq, V> Default for SyncBoundedLru<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> From<BoundedLru<K, V>> for SyncBoundedLru<K, V> {
    fn from(cache: BoundedLru<K, V>) -> Self {
        SyncBoundedLru {
            inner: Mutex::new(cache),
        }
    }
}

impl<K: Hash + Eq, V> SyncBoundedLru<K, V> {
    pub fn new() -> SyncBoundedLru<K, V> {
        BoundedLru::new().into()
    }

    pub fn with_config(config: LruConfig) -> SyncBoundedLru<K, V> {
        BoundedLru::with_config(config).into()
    }

    fn lock(&self) -> MutexGuard<'_, BoundedLru<K, V>> {
        self.inner
            .lock()
            .expect("A thread panicked while holding the cache lock")
    }

    /// Run a closure against the inner cache, holding the lock for the duration.
    ///
    /// Useful for batching several operations so that nothing else interleaves with them.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut BoundedLru<K, V>) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    pub fn insert(&self, key: K, value: V, cost: u64) -> Result<Option<V>, CacheError> {
        self.lock().insert(key, value, cost)
    }

    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.lock().put(key, value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().remove(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn clear(&self) {
        self.lock().clear()
    }

    pub fn set_size_limit(&self, limit: u64) {
        self.lock().set_size_limit(limit)
    }

    pub fn set_count_limit(&self, limit: u64) {
        self.lock().set_count_limit(limit)
    }

    pub fn current_size(&self) -> u64 {
        self.lock().current_size()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    pub fn into_inner(self) -> BoundedLru<K, V> {
        self.inner
            .into_inner()
            .expect("A thread panicked while holding the cache lock")
    }
}

impl<K: Hash + Eq, V: Clone> SyncBoundedLru<K, V> {
    /// Get a clone of a value, making it the most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_basic_ops() {
        let cache = SyncBoundedLru::with_config(
            LruConfigBuilder::default()
                .size_limit(10)
                .build()
                .expect("Should build"),
        );

        cache.insert("a", Arc::new(1), 6).unwrap();
        cache.insert("b", Arc::new(2), 6).unwrap();
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b").as_deref(), Some(&2));
        assert_eq!(cache.current_size(), 6);

        assert_eq!(cache.remove(&"b").as_deref(), Some(&2));
        assert!(cache.is_empty());

        cache.put("c", Arc::new(3));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_with_lock_batches() {
        let cache = SyncBoundedLru::new();
        cache.set_count_limit(2);
        let order = cache.with_lock(|c| {
            c.put(1u64, 1u64);
            c.put(2, 2);
            c.get(&1);
            c.put(3, 3);
            c.iter().map(|(k, _)| *k).collect::<Vec<_>>()
        });
        assert_eq!(order, vec![3, 1]);
    }

    #[test]
    fn test_shared_between_threads() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 500;

        let cache = SyncBoundedLru::<u64, u64>::new();
        cache.set_count_limit(64);
        cache.set_size_limit(200);

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let cache = &cache;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let key = (t * PER_THREAD + i) % 100;
                        cache.insert(key, key, i % 7).unwrap();
                        if let Some(v) = cache.get(&key) {
                            assert_eq!(v, key);
                        }
                        if i % 13 == 0 {
                            cache.remove(&key);
                        }
                    }
                });
            }
        });

        assert!(cache.len() <= 64);
        assert!(cache.current_size() <= 200);

        let stats = cache.stats();
        assert_eq!(stats.inserts + stats.replacements, THREADS * PER_THREAD);

        let inner = cache.into_inner();
        inner.check_invariants();
        assert_eq!(inner.iter().count(), inner.len());
    }
}
