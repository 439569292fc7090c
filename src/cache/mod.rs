//! Result cache with adaptive freshness and proactive eviction.
//!
//! Entries are keyed by the normalized query and remember the data
//! fingerprint they were produced under; a fingerprint mismatch is always a
//! miss regardless of age. Time-to-live is tiered by how long the result
//! took to produce: sub-50ms results keep the full configured max age
//! (default 30 minutes), sub-100ms results a third of it, slower results a
//! sixth. At capacity, a proactive pass evicts entries that are past the max
//! age or took over 200ms, most expensive first, before falling back to
//! least-recently-used eviction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::item::ResultItem;
use crate::metrics;

/// Results produced faster than this get the full TTL.
const FAST_THRESHOLD: Duration = Duration::from_millis(50);

/// Results produced faster than this (but not fast) get a third of the TTL.
const MEDIUM_THRESHOLD: Duration = Duration::from_millis(100);

/// Results slower than this are eviction candidates at capacity.
const EXPENSIVE_THRESHOLD: Duration = Duration::from_millis(200);

struct CacheEntry {
    items: Vec<ResultItem>,
    fingerprint: String,
    created_ms: u64,
    duration: Duration,
    last_access_ms: AtomicU64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded query-result cache.
///
/// One reader/writer lock guards the entry map; lookups share the read lock
/// and refresh their last-access stamp atomically, so a hit never blocks
/// other readers.
pub struct ResultCache {
    epoch: Instant,
    capacity: usize,
    max_age: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    #[cfg(test)]
    clock_skew_ms: AtomicU64,
}

impl ResultCache {
    pub fn new(capacity: usize, max_age: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            capacity,
            max_age,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            #[cfg(test)]
            clock_skew_ms: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - a stale cache entry is
            // recoverable, a dead cache is not
            poisoned.into_inner()
        })
    }

    fn entries_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            // Clear the poison and return the guard - a stale cache entry is
            // recoverable, a dead cache is not
            poisoned.into_inner()
        })
    }

    fn now_ms(&self) -> u64 {
        #[cfg(test)]
        let skew = self.clock_skew_ms.load(Ordering::Relaxed);
        #[cfg(not(test))]
        let skew = 0;
        self.epoch.elapsed().as_millis() as u64 + skew
    }

    /// TTL granted to an entry based on how long it took to produce.
    fn ttl_for(&self, duration: Duration) -> Duration {
        if duration < FAST_THRESHOLD {
            self.max_age
        } else if duration < MEDIUM_THRESHOLD {
            self.max_age / 3
        } else {
            self.max_age / 6
        }
    }

    /// Look up results for `query` produced under `fingerprint`.
    ///
    /// A hit requires fingerprint equality and age within the entry's
    /// duration-tiered TTL; anything else is a miss.
    pub fn get(&self, query: &str, fingerprint: &str) -> Option<Vec<ResultItem>> {
        let key = normalize(query);
        let now = self.now_ms();
        let entries = self.entries();

        let hit = entries.get(&key).filter(|entry| {
            entry.fingerprint == fingerprint
                && now.saturating_sub(entry.created_ms)
                    < self.ttl_for(entry.duration).as_millis() as u64
        });

        match hit {
            Some(entry) => {
                entry.last_access_ms.store(now, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::CACHE_HITS.inc();
                Some(entry.items.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::CACHE_MISSES.inc();
                None
            }
        }
    }

    /// Insert results for `query`, evicting first if the cache is full.
    pub fn put(
        &self,
        query: &str,
        fingerprint: impl Into<String>,
        items: Vec<ResultItem>,
        duration: Duration,
    ) {
        if self.capacity == 0 {
            return;
        }

        let key = normalize(query);
        let now = self.now_ms();
        let mut entries = self.entries_mut();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            self.evict_locked(&mut entries, now);
        }

        entries.insert(
            key,
            CacheEntry {
                items,
                fingerprint: fingerprint.into(),
                created_ms: now,
                duration,
                last_access_ms: AtomicU64::new(now),
            },
        );
        metrics::CACHE_SIZE.set(entries.len() as f64);
    }

    /// Make room for one insertion. Proactively drops stale or expensive
    /// entries (up to a quarter of capacity per pass, most expensive first),
    /// then falls back to least-recently-used until below capacity.
    fn evict_locked(&self, entries: &mut HashMap<String, CacheEntry>, now: u64) {
        let target = (self.capacity / 4).max(1);
        let max_age_ms = self.max_age.as_millis() as u64;

        let mut candidates: Vec<(String, Duration, u64)> = entries
            .iter()
            .filter(|(_, entry)| {
                now.saturating_sub(entry.created_ms) > max_age_ms
                    || entry.duration > EXPENSIVE_THRESHOLD
            })
            .map(|(key, entry)| {
                (
                    key.clone(),
                    entry.duration,
                    entry.last_access_ms.load(Ordering::Relaxed),
                )
            })
            .collect();

        candidates.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        candidates.truncate(target);

        let mut evicted = 0u64;
        for (key, _, _) in candidates {
            entries.remove(&key);
            evicted += 1;
        }

        while entries.len() >= self.capacity {
            let lru = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access_ms.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            match lru {
                Some(key) => {
                    entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            metrics::CACHE_EVICTIONS.inc_by(evicted as f64);
            debug!("Evicted {} cache entries", evicted);
        }
    }

    /// Drop every entry and reset the hit/miss counters.
    ///
    /// Called whenever the underlying data set changes, e.g. after a
    /// provider rebuild.
    pub fn invalidate(&self) {
        let mut entries = self.entries_mut();
        let dropped = entries.len();
        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        metrics::CACHE_SIZE.set(0.0);
        debug!("Cache invalidated, dropped {} entries", dropped);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Advance the cache's notion of time without sleeping.
    #[cfg(test)]
    pub(crate) fn advance(&self, delta: Duration) {
        self.clock_skew_ms
            .fetch_add(delta.as_millis() as u64, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, query: &str) -> bool {
        self.entries().contains_key(&normalize(query))
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}
