//! a [BoundedLru] is an Lru cache which evicts once either the total cost of its items or the number of its items goes
//! over a limit.
//!
//! This is implemented as a vec-backed linked list, where freed slots are chained together for reuse, plus an auxiliary
//! hash-based index from keys to slots.  Keys are shared between the slot and the index behind an `Arc`, so `K` doesn't
//! need to be `Clone`.
//!
//! Limits of 0 mean unlimited.  An item whose cost alone is over the size limit is admitted, then evicted immediately
//! along with everything older than it, leaving the cache empty.
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use ahash::RandomState;
use tracing::{debug, trace};

use crate::*;

struct OccupiedEntry<K, V> {
    key: Arc<K>,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
    cost: u64,
}

struct EmptyEntry {
    next_empty: Option<usize>,
}

enum CacheEntry<K, V> {
    /// This entry is empty, possibly with a pointer at the next empty entry.
    Empty(EmptyEntry),
    /// This entry is occupied, and doubly linked to the previous and next entry.
    Occupied(OccupiedEntry<K, V>),
}

impl<K, V> CacheEntry<K, V> {
    fn as_occupied_mut(&mut self) -> &mut OccupiedEntry<K, V> {
        match self {
            Self::Occupied(ref mut x) => x,
            _ => panic!("Entry should be occupied"),
        }
    }

    fn as_occupied(&self) -> &OccupiedEntry<K, V> {
        match self {
            Self::Occupied(ref x) => x,
            _ => panic!("Entry should be occupied"),
        }
    }

    fn as_empty_mut(&mut self) -> &mut EmptyEntry {
        match self {
            CacheEntry::Empty(ref mut x) => x,
            _ => panic!("Entry should be empty"),
        }
    }
}

pub struct BoundedLru<K: Hash + Eq, V> {
    entries: Vec<CacheEntry<K, V>>,
    /// Points at the slot holding the key.
    index: HashMap<Arc<K>, usize, RandomState>,
    /// Past what total cost do we start evicting?  0 is unlimited.
    size_limit: u64,
    /// Past how many entries do we start evicting?  0 is unlimited.
    count_limit: u64,
    /// Most recently used.
    entries_head: Option<usize>,
    /// Least recently used, and the next thing to go.
    entries_tail: Option<usize>,
    empty_head: Option<usize>,
    /// Current cost of the items in the cache.
    current_size: u64,
    stats: CacheStats,
}

impl<K: Hash + Eq, V> Default for BoundedLru<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> BoundedLru<K, V> {
    /// An empty, unbounded cache.
    pub fn new() -> BoundedLru<K, V> {
        Self::with_capacity(0)
    }

    /// An empty, unbounded cache with room for `capacity_hint` entries before it has to reallocate.
    pub fn with_capacity(capacity_hint: usize) -> BoundedLru<K, V> {
        Self::with_config(LruConfig {
            capacity_hint,
            ..Default::default()
        })
    }

    pub fn with_config(config: LruConfig) -> BoundedLru<K, V> {
        BoundedLru {
            entries: Vec::with_capacity(config.capacity_hint),
            index: HashMap::with_capacity_and_hasher(config.capacity_hint, RandomState::new()),
            size_limit: config.size_limit,
            count_limit: config.count_limit,
            entries_head: None,
            entries_tail: None,
            empty_head: None,
            current_size: 0,
            stats: Default::default(),
        }
    }

    pub fn size_limit(&self) -> u64 {
        self.size_limit
    }

    pub fn count_limit(&self) -> u64 {
        self.count_limit
    }

    /// Change the maximum total cost, evicting right away if the cache is now over it.  0 removes the limit.
    pub fn set_size_limit(&mut self, limit: u64) {
        debug!(size_limit = limit, current_size = self.current_size, "Setting size limit");
        self.size_limit = limit;
        self.maybe_evict();
    }

    /// Change the maximum number of entries, evicting right away if the cache is now over it.  0 removes the limit.
    pub fn set_count_limit(&mut self, limit: u64) {
        debug!(count_limit = limit, len = self.len(), "Setting count limit");
        self.count_limit = limit;
        self.maybe_evict();
    }

    /// Sum of the costs of everything in the cache.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = Default::default();
    }

    /// Take an occupied index out of the list, leaving its own links cleared.
    fn unlink_index(&mut self, index: usize) {
        let (prev, next) = {
            let entry = self.entries[index].as_occupied_mut();
            (entry.prev.take(), entry.next.take())
        };

        match prev {
            Some(p) => self.entries[p].as_occupied_mut().next = next,
            None => self.entries_head = next,
        }

        match next {
            Some(n) => self.entries[n].as_occupied_mut().prev = prev,
            None => self.entries_tail = prev,
        }
    }

    /// Link an occupied but unlinked index in as the head.
    fn link_at_head(&mut self, index: usize) {
        let old_head = self.entries_head;
        {
            let entry = self.entries[index].as_occupied_mut();
            entry.prev = None;
            entry.next = old_head;
        }

        match old_head {
            Some(h) => self.entries[h].as_occupied_mut().prev = Some(index),
            // If there was no head there was no tail either.
            None => self.entries_tail = Some(index),
        }
        self.entries_head = Some(index);
    }

    /// Given the index of an occupied entry, make it the most recent item.
    fn make_most_recent(&mut self, index: usize) {
        if self.entries_head == Some(index) {
            return;
        }

        self.unlink_index(index);
        self.link_at_head(index);
    }

    /// Get a value, making it the most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let ind = self.touch(key)?;
        Some(&self.entries[ind].as_occupied().value)
    }

    /// Get a value mutably, making it the most recently used.
    ///
    /// The cost of the entry is unchanged; re-insert it if the cost should change.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let ind = self.touch(key)?;
        Some(&mut self.entries[ind].as_occupied_mut().value)
    }

    /// Look up a key for `get`/`get_mut`, recording the hit or miss and moving a hit to the head.
    fn touch(&mut self, key: &K) -> Option<usize> {
        match self.index.get(key).copied() {
            Some(ind) => {
                self.stats.hits += 1;
                self.make_most_recent(ind);
                Some(ind)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Get a value without changing how recently it was used.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let ind = *self.index.get(key)?;
        Some(&self.entries[ind].as_occupied().value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// The least recently used entry, which is the next one to be evicted.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let entry = self.entries[self.entries_tail?].as_occupied();
        Some((&*entry.key, &entry.value))
    }

    /// Make a specific index of the map become empty, handing back what was there.
    fn become_empty(&mut self, index: usize) -> OccupiedEntry<K, V> {
        self.unlink_index(index);
        let mut old = CacheEntry::Empty(EmptyEntry {
            next_empty: self.empty_head,
        });
        std::mem::swap(&mut old, &mut self.entries[index]);
        self.empty_head = Some(index);
        match old {
            CacheEntry::Occupied(entry) => {
                self.index.remove(&*entry.key);
                self.current_size -= entry.cost;
                entry
            }
            _ => panic!("Should have been occupied"),
        }
    }

    /// Remove a key, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let ind = *self.index.get(key)?;
        self.stats.removals += 1;
        Some(self.become_empty(ind).value)
    }

    /// Remove and return the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let tail = self.entries_tail?;
        let OccupiedEntry { key, value, .. } = self.become_empty(tail);
        self.stats.removals += 1;
        // The index let go of its copy of the key in `become_empty`.
        let key = Arc::try_unwrap(key)
            .unwrap_or_else(|_| panic!("Key should only be held by the removed entry"));
        Some((key, value))
    }

    /// Find an available empty index, or make one if necessary.
    fn find_empty(&mut self) -> usize {
        if let Some(e) = self.empty_head {
            self.empty_head = self.entries[e].as_empty_mut().next_empty;
            return e;
        }

        self.entries
            .push(CacheEntry::Empty(EmptyEntry { next_empty: None }));
        self.entries.len() - 1
    }

    fn invalid_cost(&self, cost: u64) -> CacheError {
        CacheError::InvalidCost {
            cost,
            current_size: self.current_size,
        }
    }

    /// Add an entry to the cache, making it the most recently used.  Return the old value if this key was already
    /// present.
    ///
    /// Fails without changing anything if `cost` can't be added to the size of the cache.  Otherwise, the cache evicts
    /// least recently used entries until it is back within its limits, which may include the entry just inserted.
    pub fn insert(&mut self, key: K, value: V, cost: u64) -> Result<Option<V>, CacheError> {
        let ret = match self.index.get(&key).copied() {
            Some(ind) => {
                let old_cost = self.entries[ind].as_occupied().cost;
                let new_size = (self.current_size - old_cost)
                    .checked_add(cost)
                    .ok_or_else(|| self.invalid_cost(cost))?;

                let entry = self.entries[ind].as_occupied_mut();
                let old = std::mem::replace(&mut entry.value, value);
                entry.cost = cost;
                self.current_size = new_size;
                self.make_most_recent(ind);
                self.stats.replacements += 1;
                Some(old)
            }
            None => {
                let new_size = self
                    .current_size
                    .checked_add(cost)
                    .ok_or_else(|| self.invalid_cost(cost))?;

                // Do everything which might allocate before touching any links.
                let key_arc = Arc::new(key);
                let ind = self.find_empty();
                self.index.insert(key_arc.clone(), ind);
                self.entries[ind] = CacheEntry::Occupied(OccupiedEntry {
                    key: key_arc,
                    value,
                    prev: None,
                    next: None,
                    cost,
                });

                self.link_at_head(ind);
                self.current_size = new_size;
                self.stats.inserts += 1;
                None
            }
        };

        self.maybe_evict();
        Ok(ret)
    }

    /// Add an entry with a cost of 0, which only counts against the count limit.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        match self.insert(key, value, 0) {
            Ok(ret) => ret,
            Err(_) => unreachable!("A cost of 0 never overflows"),
        }
    }

    /// Drop everything.  Statistics are kept.
    pub fn clear(&mut self) {
        debug!(
            len = self.len(),
            current_size = self.current_size,
            "Clearing cache"
        );
        self.entries.clear();
        self.index.clear();
        self.entries_head = None;
        self.entries_tail = None;
        self.empty_head = None;
        self.current_size = 0;
    }

    fn over_budget(&self) -> bool {
        (self.size_limit != 0 && self.current_size > self.size_limit)
            || (self.count_limit != 0 && self.len() as u64 > self.count_limit)
    }

    /// Run a cache eviction if required.
    fn maybe_evict(&mut self) {
        while self.over_budget() {
            let cur = match self.entries_tail {
                Some(t) => t,
                // Only reachable if a limit can't be met even when empty, which limits of 0 rule out.
                None => break,
            };

            let evicted = self.become_empty(cur);
            self.stats.evictions += 1;
            trace!(
                cost = evicted.cost,
                current_size = self.current_size,
                len = self.len(),
                "Evicted least recently used entry"
            );
        }
    }

    /// Iterator visiting entries in most-recently-used order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let mut ind = self.entries_head;
        std::iter::from_fn(move || {
            let next = ind?;
            let ret = self.entries[next].as_occupied();
            ind = ret.next;
            Some((&*ret.key, &ret.value))
        })
    }
}

impl<K: Hash + Eq, V: EstimateCost> BoundedLru<K, V> {
    /// Add an entry, asking the value for its own cost.
    pub fn insert_estimated(&mut self, key: K, value: V) -> Result<Option<V>, CacheError> {
        let cost = value.estimate_cost();
        self.insert(key, value, cost)
    }
}

#[cfg(test)]
impl<K: Hash + Eq, V> BoundedLru<K, V> {
    /// Walk the whole structure and panic if anything disagrees with anything else.
    pub(crate) fn check_invariants(&self) {
        let mut count = 0usize;
        let mut cost = 0u64;
        let mut prev = None;
        let mut ind = self.entries_head;

        while let Some(i) = ind {
            let entry = self.entries[i].as_occupied();
            assert_eq!(entry.prev, prev, "Backward link of {} is wrong", i);
            assert_eq!(
                self.index.get(&*entry.key).copied(),
                Some(i),
                "Index doesn't point at slot {}",
                i
            );
            count += 1;
            cost += entry.cost;
            prev = Some(i);
            ind = entry.next;
        }

        assert_eq!(self.entries_tail, prev, "Tail isn't the last entry");
        assert_eq!(count, self.index.len(), "List and index disagree on length");
        assert_eq!(cost, self.current_size, "Running size is wrong");

        let mut empties = 0;
        let mut ind = self.empty_head;
        while let Some(i) = ind {
            ind = match &self.entries[i] {
                CacheEntry::Empty(e) => e.next_empty,
                _ => panic!("Free list reaches occupied slot {}", i),
            };
            empties += 1;
        }
        assert_eq!(
            count + empties,
            self.entries.len(),
            "Slots are leaking out of both lists"
        );

        if self.size_limit != 0 {
            assert!(self.current_size <= self.size_limit);
        }
        if self.count_limit != 0 {
            assert!(count as u64 <= self.count_limit);
        }
    }
}
