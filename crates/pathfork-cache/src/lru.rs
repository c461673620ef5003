//! Bounded least-recently-used cache.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Storage contract for memoized lookups.
pub trait ResultCache<K, V> {
    /// Fetch a value, marking it as recently used.
    fn get(&mut self, key: &K) -> Option<V>;

    /// Store a value, evicting as needed to stay within capacity.
    fn set(&mut self, key: K, value: V);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;
}

struct Entry<V> {
    value: V,
    tick: u64,
}

/// An LRU cache. Recency is tracked with a monotonically increasing tick;
/// the smallest tick is evicted first.
pub struct LruCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Tick to key, oldest first.
    order: BTreeMap<u64, K>,
    capacity: usize,
    tick: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            capacity,
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
        }
    }
}

impl<K, V> ResultCache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        let stale = std::mem::replace(&mut entry.tick, tick);
        let value = entry.value.clone();

        if let Some(key) = self.order.remove(&stale) {
            self.order.insert(tick, key);
        }
        Some(value)
    }

    fn set(&mut self, key: K, value: V) {
        let tick = self.next_tick();

        if let Some(entry) = self.entries.get_mut(&key) {
            let stale = std::mem::replace(&mut entry.tick, tick);
            entry.value = value;
            self.order.remove(&stale);
            self.order.insert(tick, key);
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.order.insert(tick, key.clone());
        self.entries.insert(key, Entry { value, tick });
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
