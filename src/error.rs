//! Errors returned at the boundary of the cache.
//!
//! Almost nothing about a cache can fail: a missing key is just `None`.  The one thing we do check is that a caller's
//! cost can actually be added to the running total.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Adding this cost would overflow the aggregate size of the cache.
    #[error("invalid cost {cost}: adding it to the current cache size {current_size} overflows")]
    InvalidCost { cost: u64, current_size: u64 },
}
