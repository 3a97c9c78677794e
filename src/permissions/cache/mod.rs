/*!
 * Decision Cache
 * Memoizes combined decisions per (subject, privilege) key
 *
 * Each key is unset, volatile or resolved. A volatile key depends on a
 * mutable condition: nothing is ever persisted for it again, so every
 * request for it re-runs the combiner.
 */

use crate::core::limits::DEFAULT_DECISION_CACHE_CAPACITY;
use crate::core::types::{PrivilegeRequest, SubjectIdentity};
use crate::permissions::types::Decision;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache key: exact subject and privilege identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject: SubjectIdentity,
    pub request: PrivilegeRequest,
}

impl CacheKey {
    pub fn new(subject: &SubjectIdentity, request: &PrivilegeRequest) -> Self {
        Self {
            subject: subject.clone(),
            request: request.clone(),
        }
    }
}

/// Value observed for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedValue {
    Unset,
    Volatile,
    Resolved(Decision),
}

#[derive(Debug, Clone, Copy)]
enum CacheEntry {
    Volatile,
    Resolved(Decision),
}

/// Concurrent decision cache
///
/// `max_size` is a soft bound: the size check and the insert are separate
/// steps, so concurrent writers of new keys can each overshoot by one entry
/// until the next write evicts back under the limit.
///
/// # Performance
/// - Sharded map: readers and writers of different keys never contend
/// - Cache-line aligned to prevent false sharing of atomic counters
#[repr(C, align(64))]
pub struct DecisionCache {
    entries: DashMap<CacheKey, CacheEntry, RandomState>,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    volatile_hits: AtomicU64,
    volatile_marks: AtomicU64,
    evictions: AtomicU64,
}

impl DecisionCache {
    /// Create new cache
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher(max_size, RandomState::new()),
            max_size: max_size.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            volatile_hits: AtomicU64::new(0),
            volatile_marks: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a key
    pub fn get(&self, key: &CacheKey) -> CachedValue {
        match self.entries.get(key).map(|entry| *entry.value()) {
            Some(CacheEntry::Resolved(decision)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                CachedValue::Resolved(decision)
            }
            Some(CacheEntry::Volatile) => {
                self.volatile_hits.fetch_add(1, Ordering::Relaxed);
                CachedValue::Volatile
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                CachedValue::Unset
            }
        }
    }

    /// Persist a decision unless the key is volatile
    ///
    /// Returns whether the decision was stored. Concurrent identical writes
    /// for the same key are harmless.
    pub fn put(&self, key: CacheKey, decision: Decision) -> bool {
        self.make_room(&key);

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if matches!(occupied.get(), CacheEntry::Volatile) {
                    return false;
                }
                occupied.insert(CacheEntry::Resolved(decision));
                true
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::Resolved(decision));
                true
            }
        }
    }

    /// Mark a key volatile; it will never be persisted again
    pub fn mark_volatile(&self, key: CacheKey) {
        self.make_room(&key);

        if !matches!(
            self.entries.insert(key, CacheEntry::Volatile),
            Some(CacheEntry::Volatile)
        ) {
            self.volatile_marks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let volatile_hits = self.volatile_hits.load(Ordering::Relaxed);
        let total = hits + misses + volatile_hits;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hits,
            misses,
            volatile_hits,
            volatile_marks: self.volatile_marks.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate,
        }
    }

    // Evict arbitrary entries until there is room. An evicted volatile
    // marker is re-established by the next evaluation's probe before
    // anything can be written for that key.
    fn make_room(&self, key: &CacheKey) {
        if self.entries.contains_key(key) {
            return;
        }
        while self.entries.len() >= self.max_size {
            let victim = self.entries.iter().next().map(|entry| entry.key().clone());
            let Some(victim) = victim else { break };
            if self.entries.remove(&victim).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(DEFAULT_DECISION_CACHE_CAPACITY)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub volatile_hits: u64,
    pub volatile_marks: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}
