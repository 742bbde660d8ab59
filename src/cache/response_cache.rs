//! TTL-bounded response cache keyed by request fingerprint.
//!
//! Entries are immutable once written and overwritten wholesale on re-put.
//! Eviction happens only by TTL expiry (observed on read) or an explicit
//! [`ResponseCache::clear`]; there is no capacity bound. The store is
//! shared process-wide behind a read/write lock, and optionally persists to
//! a JSON file. Storage faults are soft on the request path: a failed load
//! starts the cache empty (miss) and a failed save after `put` is logged
//! and skipped. Only the maintenance path (`clear`) reports them, as
//! [`CraftError::CacheUnavailable`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Fingerprint;
use crate::error::{CraftError, Result};

/// A single cached response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The response payload.
    pub response: String,
    /// Unix timestamp when the entry was created.
    pub created_at: u64,
}

/// Persistent store serialized to JSON.
#[derive(Debug, Serialize, Deserialize, Default)]
struct CacheStore {
    entries: HashMap<String, CacheEntry>,
}

/// Shared response cache with TTL expiry and optional JSON persistence.
pub struct ResponseCache {
    store: RwLock<CacheStore>,
    path: Option<PathBuf>,
    ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache with the given TTL, persisting to `path`.
    ///
    /// Existing entries at `path` are loaded; a missing or corrupt file
    /// starts the cache empty with a warning.
    pub fn new(ttl: Duration, path: PathBuf) -> Self {
        let store = Self::load_from_disk(&path);
        Self {
            store: RwLock::new(store),
            path: Some(path),
            ttl_secs: ttl.as_secs(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a memory-only cache (no persistence).
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            store: RwLock::new(CacheStore::default()),
            path: None,
            ttl_secs: ttl.as_secs(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a cached response. Returns `None` on absent or expired.
    ///
    /// Expired entries are removed when observed; a miss has no other side
    /// effect.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<String> {
        let now = Self::now_secs();
        let key = fingerprint.as_str();

        // Fast path under the read lock.
        {
            let store = self.store.read().expect("cache lock poisoned");
            match store.entries.get(key) {
                Some(entry) if now.saturating_sub(entry.created_at) <= self.ttl_secs => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %fingerprint.short(), "Cache hit");
                    return Some(entry.response.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Entry exists but is expired: upgrade to a write lock and remove.
        let mut store = self.store.write().expect("cache lock poisoned");
        let still_expired = store
            .entries
            .get(key)
            .is_some_and(|e| now.saturating_sub(e.created_at) > self.ttl_secs);
        if still_expired {
            debug!(key = %fingerprint.short(), "Cache entry expired, removing");
            store.entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a response, stamping current time. Overwrites any live entry
    /// for the same fingerprint.
    ///
    /// Persistence is best-effort: a write fault is logged and swallowed so
    /// the caller's request still succeeds.
    pub fn put(&self, fingerprint: &Fingerprint, response: String) {
        let entry = CacheEntry {
            response,
            created_at: Self::now_secs(),
        };
        {
            let mut store = self.store.write().expect("cache lock poisoned");
            store.entries.insert(fingerprint.as_str().to_string(), entry);
        }
        if let Err(e) = self.save_to_disk() {
            warn!("Failed to persist response cache: {}", e);
        }
    }

    /// Remove entries older than `older_than`, or all entries when `None`.
    ///
    /// Returns the number of entries removed. The in-memory store is always
    /// cleared; a persistence fault surfaces as
    /// [`CraftError::CacheUnavailable`] so maintenance callers can report
    /// that the file on disk still holds the old entries.
    pub fn clear(&self, older_than: Option<Duration>) -> Result<usize> {
        let removed = {
            let mut store = self.store.write().expect("cache lock poisoned");
            let before = store.entries.len();
            match older_than {
                None => store.entries.clear(),
                Some(age) => {
                    let now = Self::now_secs();
                    let cutoff = age.as_secs();
                    store
                        .entries
                        .retain(|_, e| now.saturating_sub(e.created_at) <= cutoff);
                }
            }
            before - store.entries.len()
        };
        self.save_to_disk()?;
        Ok(removed)
    }

    /// Aggregate statistics for the life of this process.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Number of live entries (expired-but-unobserved entries included).
    pub fn len(&self) -> usize {
        self.store.read().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- private helpers ---------------------------------------------------

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn load_from_disk(path: &Path) -> CacheStore {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(store) => store,
                Err(e) => {
                    warn!("Response cache file is corrupt, starting empty: {}", e);
                    CacheStore::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheStore::default(),
            Err(e) => {
                warn!("Failed to read response cache, starting empty: {}", e);
                CacheStore::default()
            }
        }
    }

    fn save_to_disk(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let data = {
            let store = self.store.read().expect("cache lock poisoned");
            serde_json::to_string_pretty(&*store)
                .map_err(|e| CraftError::CacheUnavailable(format!("cannot serialize: {e}")))?
        };
        std::fs::write(path, data).map_err(|e| {
            CraftError::CacheUnavailable(format!("cannot write {}: {e}", path.display()))
        })
    }

    /// Backdate an entry's creation time. Test hook for TTL expiry paths.
    #[cfg(test)]
    fn backdate(&self, fingerprint: &Fingerprint, by_secs: u64) {
        let mut store = self.store.write().expect("cache lock poisoned");
        if let Some(entry) = store.entries.get_mut(fingerprint.as_str()) {
            entry.created_at = entry.created_at.saturating_sub(by_secs);
        }
    }
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub entries: usize,
    /// Lookups served from cache since process start.
    pub hits: u64,
    /// Lookups that fell through since process start.
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{GenerateParams, ToolKind};

    fn fp(prompt: &str) -> Fingerprint {
        Fingerprint::compute(ToolKind::SmartChat, prompt, &GenerateParams::default(), "m")
    }

    fn test_cache() -> ResponseCache {
        ResponseCache::in_memory(Duration::from_secs(3600))
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = test_cache();
        let key = fp("hello");
        assert!(cache.get(&key).is_none());
        cache.put(&key, "world".into());
        assert_eq!(cache.get(&key), Some("world".into()));
    }

    #[test]
    fn test_put_overwrites() {
        let cache = test_cache();
        let key = fp("hello");
        cache.put(&key, "first".into());
        cache.put(&key, "second".into());
        assert_eq!(cache.get(&key), Some("second".into()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_expiry_is_fresh_miss() {
        let cache = test_cache();
        let key = fp("hello");
        cache.put(&key, "world".into());
        cache.backdate(&key, 3601);
        assert!(cache.get(&key).is_none());
        // Removed on observation.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_clear_all() {
        let cache = test_cache();
        cache.put(&fp("a"), "1".into());
        cache.put(&fp("b"), "2".into());
        assert_eq!(cache.clear(None).unwrap(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_older_than_is_selective() {
        let cache = test_cache();
        let old = fp("old");
        let fresh = fp("fresh");
        cache.put(&old, "1".into());
        cache.put(&fresh, "2".into());
        cache.backdate(&old, 600);

        let removed = cache.clear(Some(Duration::from_secs(300))).unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get(&old).is_none());
        assert_eq!(cache.get(&fresh), Some("2".into()));
    }

    #[test]
    fn test_stats_counters() {
        let cache = test_cache();
        let key = fp("hello");
        let _ = cache.get(&key); // miss
        cache.put(&key, "world".into());
        let _ = cache.get(&key); // hit
        let _ = cache.get(&key); // hit
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.json");
        let key = fp("hello");
        {
            let cache = ResponseCache::new(Duration::from_secs(3600), path.clone());
            cache.put(&key, "persisted".into());
        }
        let reloaded = ResponseCache::new(Duration::from_secs(3600), path);
        assert_eq!(reloaded.get(&key), Some("persisted".into()));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.json");
        std::fs::write(&path, "{not json").unwrap();
        let cache = ResponseCache::new(Duration::from_secs(3600), path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unwritable_path_is_soft_for_put() {
        // put() must not fail even when persistence cannot succeed.
        let cache = ResponseCache::new(
            Duration::from_secs(3600),
            PathBuf::from("/proc/geminicraft-no-such-dir/responses.json"),
        );
        let key = fp("hello");
        cache.put(&key, "world".into());
        assert_eq!(cache.get(&key), Some("world".into()));
    }

    #[test]
    fn test_unwritable_path_surfaces_from_clear() {
        let cache = ResponseCache::new(
            Duration::from_secs(3600),
            PathBuf::from("/proc/geminicraft-no-such-dir/responses.json"),
        );
        cache.put(&fp("hello"), "world".into());

        let err = cache.clear(None).unwrap_err();
        assert!(matches!(err, CraftError::CacheUnavailable(_)));
        // Memory is still cleared; only persistence failed.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_same_fingerprint_last_writer_wins() {
        use std::sync::Arc;
        let cache = Arc::new(test_cache());
        let key = Arc::new(fp("shared"));
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            let key = Arc::clone(&key);
            handles.push(std::thread::spawn(move || {
                cache.put(&key, format!("v{i}"));
                cache.get(&key)
            }));
        }
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert_eq!(cache.len(), 1);
    }
}
