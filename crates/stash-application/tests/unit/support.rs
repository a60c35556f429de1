//! Shared fixtures

use async_trait::async_trait;
use serde_json::Value;
use stash_application::CacheManager;
use stash_domain::ports::infrastructure::{SystemMetrics, SystemMetricsCollector};
use stash_domain::{CacheBackend, Error, Result};
use stash_providers::cache::MemoryCacheBackend;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Manager over a fresh memory backend named "memory"
pub fn memory_manager() -> Arc<CacheManager> {
    Arc::new(CacheManager::single(
        "test",
        "memory",
        Arc::new(MemoryCacheBackend::new()),
    ))
}

/// Memory backend whose writes, reads or deletes can be made to fail
#[derive(Debug, Default)]
pub struct FlakyBackend {
    inner: MemoryCacheBackend,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl FlakyBackend {
    pub fn failing_writes() -> Self {
        let backend = Self::default();
        backend.fail_writes.store(true, Ordering::SeqCst);
        backend
    }
}

#[async_trait]
impl CacheBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::network("read refused"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<bool> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::network("write refused"));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::network("delete refused"));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn clear(&self) -> Result<bool> {
        self.inner.clear().await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.inner.keys(pattern).await
    }

    fn backend_name(&self) -> &str {
        "flaky"
    }
}

/// Manager over a [`FlakyBackend`]
pub fn flaky_manager(backend: FlakyBackend) -> (Arc<FlakyBackend>, Arc<CacheManager>) {
    let backend = Arc::new(backend);
    let mut backends: HashMap<String, Arc<dyn CacheBackend>> = HashMap::new();
    backends.insert("flaky".to_string(), backend.clone());
    let manager = CacheManager::new("test", "flaky", backends).unwrap();
    (backend, Arc::new(manager))
}

/// System probe reporting a fixed memory percentage
#[derive(Debug)]
pub struct FixedSystemMetrics(pub f64);

#[async_trait]
impl SystemMetricsCollector for FixedSystemMetrics {
    async fn collect(&self) -> Result<SystemMetrics> {
        Ok(SystemMetrics {
            memory_percent: self.0,
            ..SystemMetrics::default()
        })
    }
}
