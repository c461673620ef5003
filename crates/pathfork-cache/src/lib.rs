//! Memoized route lookups for `pathfork`.
//!
//! [`CachedRouter`] wraps a fully built [`pathfork::Router`] and remembers
//! the outcome of dynamic lookups keyed by method and raw path, evicting the
//! least recently used entry once the configured capacity is reached.
//! Literal routes are answered by the router's static table and never enter
//! the cache.

pub mod cached;
pub mod lru;

pub use cached::{CacheConfig, CacheKey, CachedRouter};
pub use lru::{LruCache, ResultCache};
