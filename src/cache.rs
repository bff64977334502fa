//! Process-local key/value cache with per-entry expiry and a size bound

use lru::LruCache;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

struct StoredEntry<T> {
    value: T,
    expires_at: Instant,
}

/// Thread-safe TTL cache. Nothing is written to disk.
///
/// Holds at most `capacity` entries; inserting into a full cache evicts the
/// least recently used one.
pub struct Cache<T> {
    store: Mutex<LruCache<String, StoredEntry<T>>>,
}

impl<T: Clone + Debug> Cache<T> {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            store: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Stores a value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self))]
    pub fn put(&self, key: &str, value: T, ttl: Duration) {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            tracing::warn!("TTL overflow, not caching");
            return;
        };
        let evicted = self
            .store
            .lock()
            .push(key.to_string(), StoredEntry { value, expires_at });
        if let Some((old_key, _)) = evicted.filter(|(old_key, _)| old_key != key) {
            tracing::debug!("Evicted least recently used key {}", old_key);
        }
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub fn get(&self, key: &str) -> Option<T> {
        let mut store = self.store.lock();
        let lookup = store
            .get(key)
            .map(|entry| (Instant::now() < entry.expires_at).then(|| entry.value.clone()));
        match lookup {
            Some(Some(value)) => {
                tracing::debug!("Key found and still fresh");
                Some(value)
            }
            Some(None) => {
                tracing::debug!("Key found but expired");
                store.pop(key);
                None
            }
            None => {
                tracing::debug!("Key not found");
                None
            }
        }
    }

    /// Manually removes a key from the cache.
    pub fn remove(&self, key: &str) {
        self.store.lock().pop(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
