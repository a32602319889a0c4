use crate::prelude::Arc;
use crate::tiles::entry::CacheEntry;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded LRU of tile entries keyed by source key (the tile URL).
///
/// Whatever the LRU pushes out is cancelled, so an evicted tile that was still
/// loading never uploads into a texture nobody draws.
#[derive(Debug)]
pub struct TileCache {
    entries: LruCache<String, Arc<CacheEntry>>,
}

impl TileCache {
    /// Create a new tile cache with the given capacity (at least one entry)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Looks up an entry and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).cloned()
    }

    /// Looks up an entry without touching recency.
    pub fn peek(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries.peek(key).cloned()
    }

    /// Inserts `entry` under its key as most recently used. The entry it displaces
    /// (the previous value for the key, or the LRU victim when full) is cancelled
    /// and returned.
    pub fn insert(&mut self, entry: Arc<CacheEntry>) -> Option<Arc<CacheEntry>> {
        let key = entry.key().to_string();
        let (old_key, displaced) = self.entries.push(key, entry.clone())?;
        if Arc::ptr_eq(&displaced, &entry) {
            return None;
        }
        if displaced.cancel() {
            log::trace!("cancelled displaced tile {}", old_key);
        }
        Some(displaced)
    }

    /// Remove a tile from the cache without cancelling it
    pub fn remove(&mut self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries.pop(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Cancels every pending entry and empties the cache
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.iter() {
            entry.cancel();
        }
        self.entries.clear();
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Raises the capacity to at least `capacity`. Never shrinks, so nothing is
    /// evicted. Returns `true` when the cache grew.
    pub fn grow_to(&mut self, capacity: usize) -> bool {
        match NonZeroUsize::new(capacity) {
            Some(cap) if cap > self.entries.cap() => {
                self.entries.resize(cap);
                true
            }
            _ => false,
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(crate::core::constants::DEFAULT_CACHE_CAPACITY)
    }
}
