//! Penetration Guard
//!
//! Shields an expensive loader from stampedes and from repeated lookups of
//! keys that do not exist:
//!
//! 1. A cached value is returned as is. A cached null marker means the key
//!    is known to be absent, and `None` is returned without fetching.
//! 2. On a miss the caller takes the key's lock and checks the cache again.
//! 3. Still a miss: the loader runs. `None` stores a null marker for the
//!    null TTL; `Some(v)` stores `v` with the caller's TTL.
//! 4. The lock is released and dropped from the table once nobody else
//!    holds or waits on it.
//!
//! At most one loader runs per key at a time, and waiters get the value
//! it produced. The lock table itself is a sharded map whose shard guard is
//! never held across the loader.

use crate::services::manager::CacheManager;
use dashmap::DashMap;
use serde_json::Value;
use stash_domain::constants::{DEFAULT_NULL_VALUE_TTL_SECS, NULL_VALUE_MARKER};
use stash_domain::error::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

type KeyLock = Arc<Mutex<()>>;

/// What the cache says about a key
enum Lookup {
    Hit(Value),
    KnownAbsent,
    Miss,
}

fn is_null_marker(value: &Value) -> bool {
    value.as_str() == Some(NULL_VALUE_MARKER)
}

/// Holds one reference to a key's lock and prunes the table on drop
struct LockLease<'a> {
    locks: &'a DashMap<String, KeyLock>,
    key: &'a str,
    lock: KeyLock,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        // Table + this lease; any higher count is another caller.
        self.locks
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

/// Per-key request coalescing with null-value caching
#[derive(Debug)]
pub struct PenetrationGuard {
    cache: Arc<CacheManager>,
    null_ttl: Duration,
    locks: DashMap<String, KeyLock>,
}

impl PenetrationGuard {
    /// Guard caching absent keys for the default 5 minutes
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self::with_null_ttl(cache, Duration::from_secs(DEFAULT_NULL_VALUE_TTL_SECS))
    }

    /// Guard caching absent keys for `null_ttl`
    pub fn with_null_ttl(cache: Arc<CacheManager>, null_ttl: Duration) -> Self {
        Self {
            cache,
            null_ttl,
            locks: DashMap::new(),
        }
    }

    /// How long absent keys stay shielded
    pub fn null_ttl(&self) -> Duration {
        self.null_ttl
    }

    /// Keys with a lock currently in the table
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    async fn lookup(&self, key: &str) -> Result<Lookup> {
        Ok(match self.cache.get(key).await? {
            Some(value) if is_null_marker(&value) => Lookup::KnownAbsent,
            Some(value) => Lookup::Hit(value),
            None => Lookup::Miss,
        })
    }

    /// Read `key`, running `fetch` at most once across concurrent callers
    ///
    /// Loader errors are returned to the caller that ran it and are not
    /// cached; waiting callers then retry the load themselves.
    pub async fn get_with_protection<F, Fut>(
        &self,
        key: &str,
        fetch: F,
        ttl: Option<Duration>,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        match self.lookup(key).await? {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::KnownAbsent => return Ok(None),
            Lookup::Miss => {}
        }

        let lock = self.locks.entry(key.to_string()).or_default().clone();
        let lease = LockLease {
            locks: &self.locks,
            key,
            lock,
        };
        let _permit = lease.lock.lock().await;

        match self.lookup(key).await? {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::KnownAbsent => return Ok(None),
            Lookup::Miss => {}
        }

        match fetch().await? {
            Some(value) => {
                if let Err(e) = self.cache.set(key, value.clone(), ttl).await {
                    tracing::warn!(key = %key, error = %e, "failed to cache fetched value");
                }
                Ok(Some(value))
            }
            None => {
                let marker = Value::String(NULL_VALUE_MARKER.to_string());
                if let Err(e) = self.cache.set(key, marker, Some(self.null_ttl)).await {
                    tracing::warn!(key = %key, error = %e, "failed to cache null marker");
                } else {
                    tracing::debug!(key = %key, null_ttl_secs = self.null_ttl.as_secs(), "cached null marker");
                }
                Ok(None)
            }
        }
    }
}
