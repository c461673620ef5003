//! A router wrapper that memoizes dynamic lookups.

use parking_lot::Mutex;
use serde::Deserialize;

use pathfork::{Match, Resolved, Router};

use crate::lru::{LruCache, ResultCache};

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of memoized lookups.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Cache key: request method and raw request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: String,
    pub path: String,
}

impl CacheKey {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
        }
    }
}

/// A frozen [`Router`] with a result cache in front of it.
///
/// Only successful lookups are stored. A cache hit hands back the same
/// parameter allocation as the lookup that filled it.
pub struct CachedRouter<T, C = LruCache<CacheKey, Resolved>> {
    router: Router<T>,
    cache: Mutex<C>,
}

impl<T> CachedRouter<T> {
    /// Wrap `router` with a default-sized LRU cache.
    pub fn new(router: Router<T>) -> Self {
        Self::with_config(router, &CacheConfig::default())
    }

    /// Wrap `router` with an LRU cache sized by `config`.
    pub fn with_config(router: Router<T>, config: &CacheConfig) -> Self {
        Self::with_cache(router, LruCache::new(config.capacity))
    }
}

impl<T, C> CachedRouter<T, C>
where
    C: ResultCache<CacheKey, Resolved>,
{
    /// Wrap `router` with a caller-supplied cache.
    pub fn with_cache(router: Router<T>, cache: C) -> Self {
        Self {
            router,
            cache: Mutex::new(cache),
        }
    }

    /// Look up a request, consulting the cache for non-literal paths.
    pub fn lookup(&self, method: &str, path: &str) -> Option<Match<'_, T>> {
        if let Some(found) = self.router.lookup_static(method, path) {
            return Some(found);
        }

        let key = CacheKey::new(method, path);
        if let Some(resolved) = self.cache.lock().get(&key) {
            tracing::trace!(method = %method, path = %path, "Route cache hit");
            return self.router.to_match(&resolved);
        }

        let resolved = self.router.resolve(method, path)?;
        self.cache.lock().set(key, resolved.clone());
        self.router.to_match(&resolved)
    }

    /// The wrapped router.
    pub fn router(&self) -> &Router<T> {
        &self.router
    }

    /// Number of memoized lookups.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}
