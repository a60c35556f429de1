//! Null cache backend
//!
//! Accepts every write and stores nothing. Selecting it disables caching
//! without changing callers.

use async_trait::async_trait;
use serde_json::Value;
use stash_domain::error::Result;
use stash_domain::ports::providers::cache::CacheBackend;
use std::time::Duration;

/// Backend that never holds a value
///
/// # Example
///
/// ```rust
/// use stash_providers::cache::NullCacheBackend;
///
/// let backend = NullCacheBackend::new();
/// // All operations succeed but nothing is cached
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCacheBackend;

impl NullCacheBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for NullCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<bool> {
        Ok(true)
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn clear(&self) -> Result<bool> {
        Ok(true)
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn backend_name(&self) -> &str {
        "null"
    }
}
