//! Cache Backend Port
//!
//! Contract every storage backend implements. Values are opaque JSON
//! payloads; keys are plain strings already prefixed by the manager.
//!
//! ## Semantics
//!
//! | Operation | Returns |
//! |-----------|---------|
//! | `get` | `Ok(None)` on miss or expiry; never returns an expired value |
//! | `set` | `Ok(true)` once stored |
//! | `delete` | whether a live value existed; deleting twice is harmless |
//! | `exists` | whether a live value exists |
//! | `clear` | `Ok(true)` once everything is gone |
//! | `keys` | keys matching a glob pattern (`*`, `?`, `[...]`) |

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Operation counters kept by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStats {
    /// Operations attempted
    pub operations: u64,
    /// Operations that failed
    pub errors: u64,
    /// Reads that found a value
    pub hits: u64,
    /// Reads that found nothing
    pub misses: u64,
}

/// Cache Backend Port
///
/// All operations must be safe to call concurrently on one instance.
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
/// use std::time::Duration;
///
/// backend.set("stash:u:1", json!({"name": "Ann"}), Some(Duration::from_secs(2))).await?;
/// if let Some(value) = backend.get("stash:u:1").await? {
///     println!("{value}");
/// }
/// ```
#[async_trait]
pub trait CacheBackend: Send + Sync + std::fmt::Debug {
    /// Fetch a live value
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value; `None` TTL means no expiry
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<bool>;

    /// Remove a value, reporting whether a live one existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Whether a live value exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remove every value
    async fn clear(&self) -> Result<bool>;

    /// List keys matching a glob pattern
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Operation counters
    fn stats(&self) -> BackendStats {
        BackendStats::default()
    }

    /// Identifier of the implementation (e.g. "memory", "file", "remote")
    fn backend_name(&self) -> &str;
}
