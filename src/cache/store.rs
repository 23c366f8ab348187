//! Time-bounded key/value store
//!
//! - Entries are never mutated after insertion; `set` replaces them
//! - An entry is readable while `now - stored_at < ttl`
//! - Expired entries read as absent and are purged on the next `set`
//! - The lock is never held across an await

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};

use super::clock::{Clock, SystemClock};

/// Fixed lifetime of a cache entry
pub fn cache_ttl() -> Duration {
    Duration::minutes(5)
}

/// An immutable cached value
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub stored_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    pub fn new(key: impl Into<String>, value: V, stored_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at,
        }
    }

    /// True once `now - stored_at >= ttl`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.stored_at >= ttl
    }
}

/// Cache statistics.
///
/// Passive only: nothing reads them to make caching decisions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from a fresh entry
    pub hits: u64,
    /// Reads with no fresh entry (absent or expired)
    pub misses: u64,
    /// Successful writes
    pub writes: u64,
    /// Reads that found an entry past its TTL
    pub expired: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    expired: AtomicU64,
}

/// Key/value map with a fixed TTL, shareable across tasks
#[derive(Debug)]
pub struct TimedCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    stats: StatCounters,
}

impl<V: Clone> TimedCache<V> {
    /// Cache on the wall clock with the standard TTL
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, cache_ttl())
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            stats: StatCounters::default(),
        }
    }

    /// Returns the value for `key` if it is still fresh
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        match entries.get(key) {
            Some(entry) if !entry.is_expired(now, self.ttl) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// Expired entries are purged as part of the write.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let now = self.clock.now();
        let key = key.into();
        let ttl = self.ttl;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| !entry.is_expired(now, ttl));
        entries.insert(key.clone(), CacheEntry::new(key, value, now));
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the raw entry, fresh or not
    pub fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            writes: self.stats.writes.load(Ordering::Relaxed),
            expired: self.stats.expired.load(Ordering::Relaxed),
        }
    }
}

impl<V: Clone> Default for TimedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
