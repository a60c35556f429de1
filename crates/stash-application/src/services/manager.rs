//! Cache Manager
//!
//! Front door for every cache call. Holds the named backends, applies the
//! key prefix (`{prefix}:{key}`) on the way in and strips it when listing,
//! and records hits, misses, errors and response times for the monitor.
//!
//! ## Example
//!
//! ```ignore
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let manager = CacheManager::new("app", "memory", backends)?;
//! manager.set("u:1", json!({"name": "Ann"}), Some(Duration::from_secs(2))).await?;
//! let user = manager.remember("u:2", || async { load_user(2).await }, None).await?;
//! let remote = manager.using("remote")?;
//! remote.delete("u:1").await?;
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use stash_domain::constants::CACHE_KEY_SEPARATOR;
use stash_domain::error::{Error, Result};
use stash_domain::ports::providers::cache::{BackendStats, CacheBackend};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by every handle of one manager
#[derive(Debug, Default)]
struct MetricsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    operations: AtomicU64,
    response_micros: AtomicU64,
}

impl MetricsRecorder {
    fn record<T>(&self, started: Instant, result: &Result<T>) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.response_micros.fetch_add(micros, Ordering::Relaxed);
        if result.is_err() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> CacheCounters {
        let operations = self.operations.load(Ordering::Relaxed);
        let total_micros = self.response_micros.load(Ordering::Relaxed);
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            operations,
            mean_response_ms: if operations == 0 {
                0.0
            } else {
                total_micros as f64 / operations as f64 / 1000.0
            },
        }
    }
}

/// Cumulative manager counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub operations: u64,
    /// Mean backend round trip in milliseconds
    pub mean_response_ms: f64,
}

/// Cache operations bound to one named backend
///
/// Cheap to clone; all handles of a manager share its counters.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    name: String,
    prefix: String,
    default_ttl: Option<Duration>,
    backend: Arc<dyn CacheBackend>,
    recorder: Arc<MetricsRecorder>,
}

impl CacheHandle {
    /// Registered name of the backend
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying backend
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Key as stored in the backend
    pub fn prefixed(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{CACHE_KEY_SEPARATOR}{key}", self.prefix)
        }
    }

    fn strip_prefix(&self, key: String) -> String {
        if self.prefix.is_empty() {
            return key;
        }
        match key
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(CACHE_KEY_SEPARATOR))
        {
            Some(rest) => rest.to_string(),
            None => key,
        }
    }

    /// TTL actually applied for a caller-supplied `ttl`
    pub fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.default_ttl)
    }

    /// Fetch a value
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let started = Instant::now();
        let result = self.backend.get(&self.prefixed(key)).await;
        self.recorder.record(started, &result);
        if let Ok(found) = &result {
            self.recorder.lookup(found.is_some());
        }
        result
    }

    /// Fetch a value, falling back to `default` on a miss
    pub async fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key).await?.unwrap_or(default))
    }

    /// Store a value; `None` TTL falls back to the manager default
    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<bool> {
        let started = Instant::now();
        let result = self
            .backend
            .set(&self.prefixed(key), value, self.effective_ttl(ttl))
            .await;
        self.recorder.record(started, &result);
        result
    }

    /// Remove a value, reporting whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let started = Instant::now();
        let result = self.backend.delete(&self.prefixed(key)).await;
        self.recorder.record(started, &result);
        result
    }

    /// Whether a live value exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let started = Instant::now();
        let result = self.backend.exists(&self.prefixed(key)).await;
        self.recorder.record(started, &result);
        result
    }

    /// Remove every value in the backend
    pub async fn clear(&self) -> Result<bool> {
        let started = Instant::now();
        let result = self.backend.clear().await;
        self.recorder.record(started, &result);
        result
    }

    /// Caller-visible keys matching `pattern`
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let started = Instant::now();
        let result = self.backend.keys(&self.prefixed(pattern)).await;
        self.recorder.record(started, &result);
        Ok(result?
            .into_iter()
            .map(|key| self.strip_prefix(key))
            .collect())
    }

    /// Return the cached value, or compute, store and return it
    ///
    /// Concurrent callers on the same miss each run `compute`; wrap the call
    /// in a [`PenetrationGuard`](crate::PenetrationGuard) when that matters.
    /// A failed lookup is treated as a miss and a failed write-back is only
    /// logged: the computed value is always returned.
    pub async fn remember<F, Fut>(&self, key: &str, compute: F, ttl: Option<Duration>) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        match self.get(key).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, backend = %self.name, error = %e, "cache read failed, computing value");
            }
        }

        let value = compute().await?;
        if let Err(e) = self.set(key, value.clone(), ttl).await {
            tracing::warn!(key = %key, backend = %self.name, error = %e, "failed to store computed value");
        }
        Ok(value)
    }

    /// Fetch and deserialize a value
    ///
    /// A payload that does not fit `T` is logged and treated as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(typed) => Ok(Some(typed)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cached payload does not match requested type");
                Ok(None)
            }
        }
    }

    /// Serialize and store a value
    pub async fn set_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let value = serde_json::to_value(value)?;
        self.set(key, value, ttl).await
    }
}

/// Named backends behind one prefix and one set of counters
///
/// Operations called directly on the manager go to the default backend;
/// [`CacheManager::using`] selects another.
#[derive(Debug)]
pub struct CacheManager {
    default: CacheHandle,
    handles: HashMap<String, CacheHandle>,
    recorder: Arc<MetricsRecorder>,
}

impl CacheManager {
    /// Build a manager; fails if `default_backend` is not among `backends`
    pub fn new(
        prefix: impl Into<String>,
        default_backend: &str,
        backends: HashMap<String, Arc<dyn CacheBackend>>,
    ) -> Result<Self> {
        Self::with_default_ttl(prefix, default_backend, backends, None)
    }

    /// Build a manager applying `default_ttl` to writes that pass no TTL
    pub fn with_default_ttl(
        prefix: impl Into<String>,
        default_backend: &str,
        backends: HashMap<String, Arc<dyn CacheBackend>>,
        default_ttl: Option<Duration>,
    ) -> Result<Self> {
        let prefix = prefix.into();
        let recorder = Arc::new(MetricsRecorder::default());
        let handles: HashMap<String, CacheHandle> = backends
            .into_iter()
            .map(|(name, backend)| {
                let handle = CacheHandle {
                    name: name.clone(),
                    prefix: prefix.clone(),
                    default_ttl,
                    backend,
                    recorder: Arc::clone(&recorder),
                };
                (name, handle)
            })
            .collect();

        let default = handles.get(default_backend).cloned().ok_or_else(|| {
            Error::configuration(format!(
                "Default cache backend '{default_backend}' is not registered (available: {:?})",
                Self::sorted_names(&handles)
            ))
        })?;

        tracing::info!(
            prefix = %prefix,
            default_backend = %default_backend,
            backends = ?Self::sorted_names(&handles),
            "cache manager ready"
        );
        Ok(Self {
            default,
            handles,
            recorder,
        })
    }

    /// Manager over a single backend registered under `name`
    pub fn single(prefix: impl Into<String>, name: &str, backend: Arc<dyn CacheBackend>) -> Self {
        let recorder = Arc::new(MetricsRecorder::default());
        let default = CacheHandle {
            name: name.to_string(),
            prefix: prefix.into(),
            default_ttl: None,
            backend,
            recorder: Arc::clone(&recorder),
        };
        let handles = HashMap::from([(name.to_string(), default.clone())]);
        Self {
            default,
            handles,
            recorder,
        }
    }

    fn sorted_names(handles: &HashMap<String, CacheHandle>) -> Vec<String> {
        let mut names: Vec<String> = handles.keys().cloned().collect();
        names.sort();
        names
    }

    /// Handle for the backend registered under `name`
    pub fn using(&self, name: &str) -> Result<CacheHandle> {
        self.handles.get(name).cloned().ok_or_else(|| {
            Error::configuration(format!(
                "Cache backend '{name}' is not registered (available: {:?})",
                self.backend_names()
            ))
        })
    }

    /// Handle for the default backend
    pub fn default_handle(&self) -> &CacheHandle {
        &self.default
    }

    /// Registered backend names, sorted
    pub fn backend_names(&self) -> Vec<String> {
        Self::sorted_names(&self.handles)
    }

    /// Counters accumulated across every handle
    pub fn metrics(&self) -> CacheCounters {
        self.recorder.snapshot()
    }

    /// Counters each backend keeps for itself, keyed by backend name
    pub fn backend_stats(&self) -> BTreeMap<String, BackendStats> {
        self.handles
            .iter()
            .map(|(name, handle)| (name.clone(), handle.backend().stats()))
            .collect()
    }

    /// See [`CacheHandle::effective_ttl`]
    pub fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        self.default.effective_ttl(ttl)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.default.get(key).await
    }

    pub async fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        self.default.get_or(key, default).await
    }

    pub async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<bool> {
        self.default.set(key, value, ttl).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.default.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.default.exists(key).await
    }

    pub async fn clear(&self) -> Result<bool> {
        self.default.clear().await
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.default.keys(pattern).await
    }

    /// See [`CacheHandle::remember`]
    pub async fn remember<F, Fut>(&self, key: &str, compute: F, ttl: Option<Duration>) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.default.remember(key, compute, ttl).await
    }

    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.default.get_as(key).await
    }

    pub async fn set_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.default.set_as(key, value, ttl).await
    }
}
