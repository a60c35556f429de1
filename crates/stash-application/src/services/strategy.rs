//! Strategy Manager
//!
//! Keeps a [`CacheEntry`] per key written through it, plus a tag index
//! (`tag -> keys`). The metadata decides expiry: a key whose entry has
//! expired is treated as absent and removed, even if the backend still
//! holds the value.
//!
//! The entry table and the tag index sit behind one async mutex, held for
//! the whole of each operation (backend calls included), so a tagged write
//! and a tag invalidation never interleave.
//!
//! ## Example
//!
//! ```ignore
//! strategy.set_with_strategy("u:1", json!({"plan": "premium"}), None, ["premium"]).await?;
//! strategy.set_with_strategy("u:2", json!({"plan": "premium"}), None, ["premium"]).await?;
//! assert_eq!(strategy.invalidate_by_tag("premium").await?, 2);
//! ```

use crate::services::manager::CacheManager;
use serde_json::Value;
use stash_domain::entities::CacheEntry;
use stash_domain::error::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct StrategyState {
    entries: HashMap<String, CacheEntry>,
    tags: HashMap<String, HashSet<String>>,
}

impl StrategyState {
    /// Drop `key`'s entry and its tag memberships
    fn forget(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn track(&mut self, entry: CacheEntry) {
        self.forget(&entry.key);
        for tag in &entry.tags {
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(entry.key.clone());
        }
        self.entries.insert(entry.key.clone(), entry);
    }
}

/// Time-, tag- and pattern-based invalidation on top of a [`CacheManager`]
#[derive(Debug)]
pub struct StrategyManager {
    cache: Arc<CacheManager>,
    state: Mutex<StrategyState>,
}

impl StrategyManager {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self {
            cache,
            state: Mutex::new(StrategyState::default()),
        }
    }

    /// Manager values are written through
    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Store a value and record its TTL and tags
    ///
    /// Rewriting a key replaces its previous tags.
    pub async fn set_with_strategy<I, S>(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
        tags: I,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ttl = self.cache.effective_ttl(ttl);
        let entry = CacheEntry::new(key, value.clone(), ttl, tags);

        let mut state = self.state.lock().await;
        let stored = self.cache.set(key, value, ttl).await?;
        tracing::debug!(key = %key, tags = ?entry.tags, ttl_ms = ttl.map(|t| t.as_millis() as u64), "tracked cache entry");
        state.track(entry);
        Ok(stored)
    }

    /// Read a value, honouring the recorded TTL
    pub async fn get_with_strategy(&self, key: &str) -> Result<Option<Value>> {
        let mut state = self.state.lock().await;

        if state.entries.get(key).is_some_and(CacheEntry::is_expired) {
            state.forget(key);
            if let Err(e) = self.cache.delete(key).await {
                tracing::warn!(key = %key, error = %e, "failed to delete expired key");
            }
            tracing::debug!(key = %key, "entry expired by strategy metadata");
            return Ok(None);
        }

        let value = self.cache.get(key).await?;
        if value.is_some() {
            if let Some(entry) = state.entries.get_mut(key) {
                entry.touch();
            }
        } else if state.entries.contains_key(key) {
            // Backend already evicted it; metadata must follow.
            state.forget(key);
        }
        Ok(value)
    }

    /// Remove a value and its metadata
    pub async fn delete_with_strategy(&self, key: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.forget(key);
        self.cache.delete(key).await
    }

    /// Remove every key carrying `tag`; returns how many keys were invalidated
    ///
    /// Metadata for every tagged key is dropped even if a backend delete
    /// fails (the failure is logged and the key not counted).
    pub async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        let Some(keys) = state.tags.remove(tag) else {
            return Ok(0);
        };

        let mut removed = 0;
        for key in keys {
            state.forget(&key);
            match self.cache.delete(&key).await {
                Ok(_) => removed += 1,
                Err(e) => {
                    tracing::warn!(key = %key, tag = %tag, error = %e, "failed to delete tagged key");
                }
            }
        }
        tracing::info!(tag = %tag, removed, "invalidated cache tag");
        Ok(removed)
    }

    /// Remove every key the backend lists for `pattern`
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        let keys = self.cache.keys(pattern).await?;

        let mut removed = 0;
        for key in keys {
            state.forget(&key);
            if self.cache.delete(&key).await? {
                removed += 1;
            }
        }
        tracing::info!(pattern = %pattern, removed, "invalidated cache pattern");
        Ok(removed)
    }

    /// Remove every tracked entry whose TTL has passed
    pub async fn invalidate_expired(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let expired: Vec<String> = state
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired {
            state.forget(key);
            if let Err(e) = self.cache.delete(key).await {
                tracing::warn!(key = %key, error = %e, "failed to delete expired key");
            }
        }
        if !expired.is_empty() {
            tracing::debug!(removed = expired.len(), "swept expired cache entries");
        }
        Ok(expired.len())
    }

    /// Bulk-load untagged values; returns how many were stored
    pub async fn warm_up<I>(&self, entries: I, ttl: Option<Duration>) -> Result<usize>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut loaded = 0;
        for (key, value) in entries {
            match self
                .set_with_strategy(&key, value, ttl, std::iter::empty::<String>())
                .await
            {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!(key = %key, error = %e, "cache warm-up write failed"),
            }
        }
        tracing::info!(loaded, "cache warm-up complete");
        Ok(loaded)
    }

    /// Metadata recorded for `key`
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.state.lock().await.entries.get(key).cloned()
    }

    /// Keys currently indexed under `tag`, sorted
    pub async fn keys_for_tag(&self, tag: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let mut keys: Vec<String> = state
            .tags
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of tracked entries
    pub async fn tracked_len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}
