//! Moka in-memory cache backend
//!
//! Each stored value carries its own expiry instant. Reads check it and
//! evict an expired value on the spot, so an expired value is never
//! returned; Moka's per-entry expiry policy reclaims the rest in the
//! background.
//!
//! ## Example
//!
//! ```ignore
//! use stash_providers::cache::MemoryCacheBackend;
//!
//! let backend = MemoryCacheBackend::with_capacity(1_000);
//! ```

use crate::cache::pattern::KeyPattern;
use crate::cache::stats::StatsRecorder;
use crate::constants::MEMORY_DEFAULT_MAX_ENTRIES;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use moka::ops::compute::Op;
use serde_json::Value;
use stash_domain::error::Result;
use stash_domain::ports::providers::cache::{BackendStats, CacheBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Stored value plus its deadline
#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    ttl: Option<Duration>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            ttl,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Hands each entry's own TTL to Moka
struct PerEntryExpiry;

impl Expiry<String, MemoryEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Moka-based in-memory backend
///
/// Cloning shares the underlying map and counters.
#[derive(Clone)]
pub struct MemoryCacheBackend {
    cache: Cache<String, MemoryEntry>,
    max_entries: u64,
    stats: Arc<StatsRecorder>,
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheBackend {
    /// Backend with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_DEFAULT_MAX_ENTRIES)
    }

    /// Backend holding at most `max_entries` values
    pub fn with_capacity(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryExpiry)
            .build();
        Self {
            cache,
            max_entries,
            stats: Arc::new(StatsRecorder::new()),
        }
    }

    /// Configured capacity
    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    /// Live entry count (after applying pending maintenance)
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    /// Whether no entries are stored
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Look up `key`, evicting it if its deadline has passed
    async fn live_entry(&self, key: &str) -> Option<MemoryEntry> {
        let entry = self.cache.get(key).await?;
        if !entry.is_expired() {
            return Some(entry);
        }
        // Only remove the value we saw; a concurrent rewrite must survive.
        self.cache
            .entry_by_ref(key)
            .and_compute_with(|current| async move {
                match current {
                    Some(current) if current.value().is_expired() => Op::Remove,
                    _ => Op::Nop,
                }
            })
            .await;
        tracing::trace!(key = %key, "evicted expired entry on access");
        None
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.stats.operation();
        let value = self.live_entry(key).await.map(|entry| entry.value);
        self.stats.lookup(value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<bool> {
        self.stats.operation();
        self.cache
            .insert(key.to_string(), MemoryEntry::new(value, ttl))
            .await;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.stats.operation();
        let removed = self.cache.remove(key).await;
        Ok(removed.is_some_and(|entry| !entry.is_expired()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.stats.operation();
        Ok(self.live_entry(key).await.is_some())
    }

    async fn clear(&self) -> Result<bool> {
        self.stats.operation();
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(true)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = self.stats.track(KeyPattern::new(pattern))?;
        let mut keys: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && pattern.matches(key))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn stats(&self) -> BackendStats {
        self.stats.snapshot()
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheBackend")
            .field("max_entries", &self.max_entries)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
