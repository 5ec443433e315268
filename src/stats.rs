//! Counters describing what a cache has been doing.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups which found their key.
    pub hits: u64,
    /// Lookups which didn't.
    pub misses: u64,
    /// Inserts of keys which weren't already present.
    pub inserts: u64,
    /// Inserts which replaced the value of an existing key.
    pub replacements: u64,
    /// Entries taken out by the caller, either by key or by popping the least recently used one.
    pub removals: u64,
    /// Entries the cache dropped on its own to get back under a limit.
    pub evictions: u64,
}

impl CacheStats {
    /// `hits / (hits + misses)`, or 0.0 if nothing has been looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
