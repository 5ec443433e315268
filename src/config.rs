//! Configuration for a [BoundedLru](crate::BoundedLru).
//!
//! Both limits treat `0` as "unlimited": a cache which can hold nothing is never a useful thing to ask for, so zero is
//! free to mean "don't bound this dimension".

#[derive(Debug, Clone, Default, PartialEq, Eq, derive_builder::Builder)]
pub struct LruConfig {
    /// How many entries to pre-allocate room for.  Not a limit.
    #[builder(default)]
    pub capacity_hint: usize,
    /// Maximum total cost of everything in the cache, or 0 for no limit.
    #[builder(default)]
    pub size_limit: u64,
    /// Maximum number of entries in the cache, or 0 for no limit.
    #[builder(default)]
    pub count_limit: u64,
}
