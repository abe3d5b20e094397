//! Thread-Safe Expiring Cache
//!
//! A concurrent map from key to value where each entry may carry an absolute
//! expiry time.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over a fixed number of shards, each
//!    behind its own `RwLock`. Every operation touches exactly one shard, so
//!    each one is atomic with respect to the key it names.
//! 2. **Read-only lookups**: [`Cache::get`] only takes a read lock and never
//!    mutates. It reports an expired entry as [`Lookup::Expired`] and leaves
//!    removal to the caller.
//! 3. **Lazy Expiry**: Stale entries stay in the map until they are read and
//!    reaped, overwritten, or deleted.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Cache                              │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Number of shards for the cache.
const NUM_SHARDS: usize = 16;

/// A stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry, converting `ttl` into an absolute deadline from now.
    pub fn new(value: Bytes, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// Outcome of a [`Cache::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key holds a live value.
    Found(Bytes),
    /// The key is still in the map but its deadline has passed.
    Expired,
    /// The key was never set or has been removed.
    NotFound,
}

/// Snapshot of the cache's operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub gets: u64,
    pub sets: u64,
    pub deletes: u64,
    pub expired_removed: u64,
}

type Shard = RwLock<HashMap<Bytes, Entry>>;

/// The in-memory expiring cache.
///
/// Wrap it in an `Arc` and hand a clone to every connection task. Each
/// instance is independent, so tests can build as many as they like.
///
/// # Example
///
/// ```
/// use respcache::storage::{Cache, Lookup};
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let cache = Cache::new();
///
/// cache.set(Bytes::from("name"), Bytes::from("Ariz"), None);
/// assert_eq!(cache.get(b"name"), Lookup::Found(Bytes::from("Ariz")));
///
/// cache.set(Bytes::from("session"), Bytes::from("abc123"), Some(Duration::from_secs(60)));
/// assert_eq!(cache.get(b"missing"), Lookup::NotFound);
/// ```
pub struct Cache {
    shards: Vec<Shard>,
    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("shards", &self.shards.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        Self {
            shards,
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    // A panic while holding a shard lock cannot leave a HashMap half-updated,
    // so a poisoned lock is still safe to use.
    fn read_shard(&self, key: &[u8]) -> RwLockReadGuard<'_, HashMap<Bytes, Entry>> {
        let shard = &self.shards[self.shard_index(key)];
        shard.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_shard(&self, key: &[u8]) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry>> {
        let shard = &self.shards[self.shard_index(key)];
        shard.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `value` under `key`, replacing any previous entry whether or not
    /// it had expired. With a `ttl`, the entry expires at `now + ttl`.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = Entry::new(value, ttl);
        self.write_shard(&key).insert(key, entry);
    }

    /// Looks up `key` without modifying the map.
    pub fn get(&self, key: &[u8]) -> Lookup {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let data = self.read_shard(key);
        match data.get(key) {
            Some(entry) if entry.is_expired() => Lookup::Expired,
            Some(entry) => Lookup::Found(entry.value.clone()),
            None => Lookup::NotFound,
        }
    }

    /// Removes `key` if present.
    ///
    /// Returns `true` if an entry was removed.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        self.write_shard(key).remove(key).is_some()
    }

    /// Removes `key` only if it is still expired once the write lock is held.
    ///
    /// Use this to reap an entry that [`Cache::get`] reported as
    /// [`Lookup::Expired`]: a fresh `set` that lands between the two calls is
    /// left alone.
    pub fn remove_expired(&self, key: &[u8]) -> bool {
        let mut data = self.write_shard(key);
        let expired = data.get(key).is_some_and(Entry::is_expired);
        if expired {
            data.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }
        expired
    }

    /// Number of entries physically present, including expired ones that
    /// have not been reaped yet.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .len()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the operation counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            gets: self.get_count.load(Ordering::Relaxed),
            sets: self.set_count.load(Ordering::Relaxed),
            deletes: self.del_count.load(Ordering::Relaxed),
            expired_removed: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_set_and_get() {
        let cache = Cache::new();

        cache.set(key("key"), key("value"), None);
        assert_eq!(cache.get(b"key"), Lookup::Found(key("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let cache = Cache::new();
        assert_eq!(cache.get(b"nonexistent"), Lookup::NotFound);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = Cache::new();

        cache.set(key("key"), key("one"), Some(Duration::from_millis(5)));
        cache.set(key("key"), key("two"), None);
        thread::sleep(Duration::from_millis(20));

        // The second set dropped the first entry's deadline
        assert_eq!(cache.get(b"key"), Lookup::Found(key("two")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete() {
        let cache = Cache::new();

        cache.set(key("key"), key("value"), None);
        assert!(cache.delete(b"key"));
        assert_eq!(cache.get(b"key"), Lookup::NotFound);
        assert!(!cache.delete(b"key")); // Already deleted
    }

    #[test]
    fn test_expiry_reported_not_removed() {
        let cache = Cache::new();

        cache.set(key("key"), key("value"), Some(Duration::from_millis(10)));
        assert_eq!(cache.get(b"key"), Lookup::Found(key("value")));

        thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get(b"key"), Lookup::Expired);
        // get never mutates
        assert_eq!(cache.get(b"key"), Lookup::Expired);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = Cache::new();

        cache.set(key("key"), key("value"), Some(Duration::ZERO));
        assert_eq!(cache.get(b"key"), Lookup::Expired);
    }

    #[test]
    fn test_remove_expired() {
        let cache = Cache::new();

        cache.set(key("stale"), key("v"), Some(Duration::from_millis(5)));
        cache.set(key("fresh"), key("v"), Some(Duration::from_secs(60)));
        thread::sleep(Duration::from_millis(20));

        assert!(cache.remove_expired(b"stale"));
        assert!(!cache.remove_expired(b"fresh"));
        assert!(!cache.remove_expired(b"missing"));

        assert_eq!(cache.get(b"stale"), Lookup::NotFound);
        assert_eq!(cache.get(b"fresh"), Lookup::Found(key("v")));
        assert_eq!(cache.stats().expired_removed, 1);
    }

    #[test]
    fn test_remove_expired_spares_overwrite() {
        let cache = Cache::new();

        cache.set(key("key"), key("old"), Some(Duration::from_millis(5)));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(b"key"), Lookup::Expired);

        // Another client refreshes the key before the reaper runs
        cache.set(key("key"), key("new"), None);
        assert!(!cache.remove_expired(b"key"));
        assert_eq!(cache.get(b"key"), Lookup::Found(key("new")));
    }

    #[test]
    fn test_binary_keys_and_values() {
        let cache = Cache::new();
        let k = Bytes::from_static(b"\x00\xffkey");
        let v = Bytes::from_static(b"\r\n\x00");

        cache.set(k.clone(), v.clone(), None);
        assert_eq!(cache.get(&k), Lookup::Found(v));
    }

    #[test]
    fn test_stats() {
        let cache = Cache::new();

        cache.set(key("a"), key("1"), None);
        cache.get(b"a");
        cache.get(b"b");
        cache.delete(b"a");

        assert_eq!(
            cache.stats(),
            CacheStats {
                gets: 2,
                sets: 1,
                deletes: 1,
                expired_removed: 0,
            }
        );
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(Cache::new());
        let mut handles = vec![];

        // Distinct keys per thread plus one key every thread fights over
        for i in 0..10 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let k = format!("key-{}-{}", i, j);
                    cache.set(Bytes::from(k.clone()), Bytes::from("value"), None);
                    assert_eq!(
                        cache.get(k.as_bytes()),
                        Lookup::Found(Bytes::from("value"))
                    );

                    cache.set(key("shared"), Bytes::from(format!("{}", i)), None);
                    cache.get(b"shared");
                    if j % 10 == 0 {
                        cache.delete(format!("key-{}-{}", i, j).as_bytes());
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // 1000 distinct keys minus 100 deletions, plus the shared key
        assert_eq!(cache.len(), 901);
        match cache.get(b"shared") {
            Lookup::Found(v) => {
                let writer: usize = std::str::from_utf8(&v).unwrap().parse().unwrap();
                assert!(writer < 10);
            }
            other => panic!("shared key lost: {:?}", other),
        }
    }
}
