//! In-process TTL cache owned by each service.
//!
//! Entries are never evicted. A lookup only classifies an entry as fresh or
//! stale by comparing its age against the cache TTL, so an expired entry
//! stays available as a fallback for as long as the process runs.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use utoipa::ToSchema;

/// A cached payload and the moment it was captured.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub captured_at: Instant,
    pub payload: T,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T) -> Self {
        Self {
            captured_at: Instant::now(),
            payload,
        }
    }

    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Fresh(T),
    Stale(T),
    Missing,
}

/// Cache statistics exposed at `/cache/stats`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
    /// Age of the oldest entry in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_age_secs: Option<u64>,
}

/// Keyed cache with a single TTL. Concurrent writers are last-writer-wins.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `key`, counting a hit only for fresh entries.
    pub async fn lookup(&self, key: &K) -> Lookup<V> {
        let entries = self.entries.read().await;
        let lookup = match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl) => Lookup::Fresh(entry.payload.clone()),
            Some(entry) => Lookup::Stale(entry.payload.clone()),
            None => Lookup::Missing,
        };

        let counter = match lookup {
            Lookup::Fresh(_) => &self.hits,
            _ => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "cache_lookups_total",
            "cache" => self.name,
            "result" => if matches!(lookup, Lookup::Fresh(_)) { "hit" } else { "miss" }
        )
        .increment(1);

        lookup
    }

    /// Last stored payload for `key`, regardless of age.
    pub async fn last_known(&self, key: &K) -> Option<V> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.payload.clone())
    }

    /// Store `payload` under `key`, stamped with the current time.
    pub async fn store(&self, key: K, payload: V) {
        self.entries
            .write()
            .await
            .insert(key, CacheEntry::new(payload));
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            name: self.name.to_string(),
            entries: entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl.as_secs(),
            oldest_age_secs: entries.values().map(|e| e.age().as_secs()).max(),
        }
    }
}
