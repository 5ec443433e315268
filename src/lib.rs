//! An LRU cache bounded in two directions at once: by the total cost of what it holds, and by how many things it holds.
//!
//! Each entry carries a cost chosen by the caller, usually something like its size in bytes.  The cache keeps a running
//! total, and whenever an insert (or a change of limits) leaves either the total cost or the number of entries over its
//! limit, it evicts least recently used entries until both are back in bounds.  A limit of 0 means that dimension isn't
//! bounded at all.
//!
//! [BoundedLru] is the cache itself.  It's a plain single-owner data structure: `get` takes `&mut self` because a hit
//! reorders the recency list, and there is no locking.  If the cache needs to be shared between threads, wrap it in a
//! [SyncBoundedLru], which puts it behind a `Mutex` and hands out clones.
//!
//! ```
//! use bounded_lru::*;
//!
//! let mut cache = BoundedLru::with_config(
//!     LruConfigBuilder::default()
//!         .size_limit(10)
//!         .count_limit(100)
//!         .build()
//!         .unwrap(),
//! );
//!
//! cache.insert("a", "first", 6).unwrap();
//! cache.insert("b", "second", 6).unwrap();
//!
//! // Both together cost 12, so the older one had to go.
//! assert_eq!(cache.get(&"a"), None);
//! assert_eq!(cache.get(&"b"), Some(&"second"));
//! assert_eq!(cache.current_size(), 6);
//! ```
mod bounded_lru;
mod config;
mod error;
mod estimate_cost;
mod stats;
mod sync_lru;

pub use crate::bounded_lru::*;
pub use config::*;
pub use error::*;
pub use estimate_cost::*;
pub use stats::*;
pub use sync_lru::*;
