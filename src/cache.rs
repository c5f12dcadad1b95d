//! Utilization cache
//!
//! Keeps enriched utilization snapshots per studio for a fixed TTL so that
//! repeated lookups do not reach the upstream API. Expiry is checked on
//! read; `purge_expired` can be used to reclaim memory eagerly.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::responses::UtilizationResponse;

/// Default lifetime of a cached snapshot
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Default number of studios kept before the least recently used is dropped
pub const DEFAULT_CAPACITY: usize = 4096;

struct CacheEntry {
    snapshot: Arc<UtilizationResponse>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe TTL cache of utilization snapshots keyed by studio id
pub struct UtilizationCache {
    entries: Mutex<LruCache<u64, CacheEntry>>,
    ttl: Duration,
}

impl UtilizationCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<u64, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a live snapshot. Expired entries are dropped and reported as absent.
    pub fn get(&self, studio_id: u64) -> Option<Arc<UtilizationResponse>> {
        let mut entries = self.lock();
        let expired = entries.peek(&studio_id)?.is_expired(Instant::now());
        if expired {
            entries.pop(&studio_id);
            return None;
        }
        entries.get(&studio_id).map(|entry| entry.snapshot.clone())
    }

    /// Insert or overwrite a snapshot; the TTL restarts from now.
    pub fn set(&self, studio_id: u64, snapshot: Arc<UtilizationResponse>) {
        let entry = CacheEntry {
            snapshot,
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().put(studio_id, entry);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired: Vec<u64> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            entries.pop(id);
        }
        expired.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UtilizationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
