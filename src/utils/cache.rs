//! In-Memory TTL Cache
//!
//! Thread-safe provider-response cache keyed by normalized address.
//! DashMap gives concurrent access without a global lock.
//!
//! - TTL-based expiration
//! - Expired entries are dropped on read
//! - HIT/MISS counters for the stats endpoint

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::models::EvmAddress;

#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Cache of provider answers, one instance per signal kind
#[derive(Clone)]
pub struct TtlCache<V: Clone> {
    name: &'static str,
    store: Arc<DashMap<EvmAddress, CacheEntry<V>>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            store: Arc::new(DashMap::new()),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Value if present and still fresh
    pub fn get(&self, key: &EvmAddress) -> Option<V> {
        if let Some(entry) = self.store.get(key) {
            if entry.is_expired(self.ttl) {
                drop(entry); // release read lock before remove
                self.store.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS (expired) [{}]: {}", self.name, key);
                None
            } else {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("✅ CACHE HIT [{}]: {}", self.name, key);
                Some(entry.value.clone())
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("📭 CACHE MISS [{}]: {}", self.name, key);
            None
        }
    }

    /// Only successful answers are cached
    pub fn set(&self, key: EvmAddress, value: V) {
        debug!("💾 CACHE SET [{}]: {} (TTL: {}s)", self.name, key, self.ttl.as_secs());
        self.store.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let before = self.store.len();
        let ttl = self.ttl;
        self.store.retain(|_, entry| !entry.is_expired(ttl));
        before.saturating_sub(self.store.len())
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            name: self.name,
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub name: &'static str,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}
