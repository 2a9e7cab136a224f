use crate::core::geo::TileCoord;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const DEFAULT_CAPACITY: usize = 1024;

/// Identifies a tile across layers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub layer_id: Arc<str>,
    pub coord: TileCoord,
}

impl TileKey {
    pub fn new(layer_id: impl Into<Arc<str>>, coord: TileCoord) -> Self {
        Self {
            layer_id: layer_id.into(),
            coord,
        }
    }
}

/// In-memory tile cache using LRU eviction.
///
/// Clones share the same storage, so every tile layer of a map can hold a
/// handle to the one cache owned by the map.
#[derive(Debug, Clone)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<TileKey, Arc<Vec<u8>>>>>,
}

impl TileCache {
    /// Create a new tile cache with the given capacity; zero falls back to the default
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Get a tile from the cache, marking it recently used
    pub fn get(&self, key: &TileKey) -> Option<Arc<Vec<u8>>> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    /// Get a tile without touching its recency
    pub fn peek(&self, key: &TileKey) -> Option<Arc<Vec<u8>>> {
        self.cache.lock().ok()?.peek(key).cloned()
    }

    /// Insert a tile into the cache
    pub fn insert(&self, key: TileKey, data: Vec<u8>) {
        self.put(key, Arc::new(data));
    }

    /// Insert a tile into the cache (using Arc directly)
    pub fn put(&self, key: TileKey, data: Arc<Vec<u8>>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, data);
        }
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.cache
            .lock()
            .map(|cache| cache.contains(key))
            .unwrap_or(false)
    }

    pub fn remove(&self, key: &TileKey) -> Option<Arc<Vec<u8>>> {
        self.cache.lock().ok()?.pop(key)
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().map(|cache| cache.cap().get()).unwrap_or(0)
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_per_layer() {
        let cache = TileCache::new(8);
        let coord = TileCoord::new(1, 2, 3);
        cache.insert(TileKey::new("osm", coord), vec![1]);

        assert!(cache.contains(&TileKey::new("osm", coord)));
        assert!(!cache.contains(&TileKey::new("montmorillon-1840", coord)));
        assert_eq!(*cache.get(&TileKey::new("osm", coord)).unwrap(), vec![1]);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = TileCache::new(2);
        let key = |x| TileKey::new("osm", TileCoord::new(x, x, 5));

        cache.insert(key(1), vec![1]);
        cache.insert(key(2), vec![2]);
        // Touch the first tile so the second becomes least recently used.
        assert!(cache.get(&key(1)).is_some());
        cache.insert(key(3), vec![3]);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = TileCache::new(0);
        assert_eq!(cache.capacity(), 1024);

        let handle = cache.clone();
        handle.insert(TileKey::new("osm", TileCoord::new(0, 0, 0)), vec![9]);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(handle.is_empty());
    }
}
