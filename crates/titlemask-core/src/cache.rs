//! Memo tables owned by the engine.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::Serialize;

/// Key/value memo with an optional LRU capacity.
///
/// Unbounded by default: entries live as long as the memo. With a capacity
/// the least recently used entry is evicted once the memo is full.
#[derive(Debug, Clone)]
pub struct Memo<K, V> {
    capacity: Option<usize>,
    entries: HashMap<K, (V, u64)>,
    // last-use tick -> key, only maintained when bounded
    recency: BTreeMap<u64, K>,
    tick: u64,
}

impl<K, V> Memo<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Looks up `key`, marking it as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let bounded = self.capacity.is_some();
        let tick = self.tick + 1;
        let (value, last_used) = self.entries.get_mut(key)?;
        if bounded {
            if let Some(owned) = self.recency.remove(last_used) {
                self.recency.insert(tick, owned);
            }
            *last_used = tick;
            self.tick = tick;
        }
        Some(&*value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        let Some(capacity) = self.capacity else {
            self.entries.insert(key, (value, 0));
            return;
        };
        if capacity == 0 {
            return;
        }

        self.tick += 1;
        if let Some((_, old)) = self.entries.insert(key.clone(), (value, self.tick)) {
            self.recency.remove(&old);
        }
        self.recency.insert(self.tick, key);

        while self.entries.len() > capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counters describing how the engine's caches were used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub clean_hits: u64,
    pub mask_hits: u64,
    pub parse_hits: u64,
    /// Classifications served from an existing mask index entry.
    pub index_hits: u64,
    /// Classifications that scanned every matcher for a new mask.
    pub scans: u64,
    /// Classifications that produced no result.
    pub misses: u64,
    pub distinct_masks: usize,
    pub memoized_titles: usize,
}
