//! Redis remote cache backend
//!
//! Pooled connections (deadpool) to a Redis-protocol server. Every command
//! goes through the same path:
//!
//! 1. If the last liveness probe is older than the configured interval,
//!    `PING`; on failure the pool is rebuilt from the original config.
//! 2. The command runs under the socket timeout, inside the
//!    [`RetryPolicy`] (transient failures only).
//! 3. Operation and error counters are updated for the monitor.
//!
//! Values are stored as JSON text.
//!
//! ## Example
//!
//! ```ignore
//! use stash_domain::RemoteBackendConfig;
//! use stash_providers::cache::RedisCacheBackend;
//!
//! let backend = RedisCacheBackend::new(RemoteBackendConfig::new("localhost", 6379))?;
//! backend.incr("visits", 1).await?;
//! ```

mod retry;

pub use retry::RetryPolicy;

use crate::cache::pattern::KeyPattern;
use crate::cache::stats::StatsRecorder;
use crate::constants::{REDIS_BACKEND_NAME, REDIS_SCAN_BATCH};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use deadpool_redis::{Config as PoolSettings, Pool, PoolConfig, Runtime};
use redis::{Cmd, ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo};
use serde_json::Value;
use stash_domain::RemoteBackendConfig;
use stash_domain::error::{Error, Result};
use stash_domain::ports::providers::cache::{BackendStats, CacheBackend};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Map a Redis error to the domain taxonomy
///
/// Connection-level failures become [`Error::Network`]/[`Error::Timeout`]
/// (retried); everything the server answered with is [`Error::Remote`].
fn classify(op: &str, e: redis::RedisError) -> Error {
    if e.is_timeout() {
        Error::timeout(format!("Redis {op} timed out: {e}"))
    } else if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        Error::network_with_source(format!("Redis {op} connection failure"), e)
    } else {
        Error::remote_with_source(format!("Redis {op} failed"), e)
    }
}

fn build_pool(config: &RemoteBackendConfig) -> Result<Pool> {
    let info = ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            db: config.database,
            username: config.username.clone(),
            password: config.password.clone(),
            ..Default::default()
        },
    };

    let mut settings = PoolSettings::from_connection_info(info);
    let mut pool_config = PoolConfig::new(config.max_pool_size.max(1));
    pool_config.timeouts.wait = Some(config.connect_timeout);
    pool_config.timeouts.create = Some(config.connect_timeout);
    pool_config.timeouts.recycle = Some(config.connect_timeout);
    settings.pool = Some(pool_config);

    settings.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
        Error::configuration_with_source(
            format!("Failed to create Redis pool for {}", config.address()),
            e,
        )
    })
}

/// Redis-backed cache with retry and health probing
pub struct RedisCacheBackend {
    config: RemoteBackendConfig,
    pool: ArcSwap<Pool>,
    retry: RetryPolicy,
    last_probe: Mutex<Instant>,
    stats: StatsRecorder,
}

impl RedisCacheBackend {
    /// Build the backend and its pool; no connection is opened yet
    pub fn new(config: RemoteBackendConfig) -> Result<Self> {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Build with a custom retry policy
    pub fn with_retry(config: RemoteBackendConfig, retry: RetryPolicy) -> Result<Self> {
        let pool = build_pool(&config)?;
        tracing::info!(address = %config.address(), max_pool_size = config.max_pool_size, "Redis pool created");
        Ok(Self {
            config,
            pool: ArcSwap::from_pointee(pool),
            retry,
            last_probe: Mutex::new(Instant::now()),
            stats: StatsRecorder::new(),
        })
    }

    /// Configuration the pool is built from
    pub fn config(&self) -> &RemoteBackendConfig {
        &self.config
    }

    /// Drop the current pool and build a fresh one from the same config
    pub fn reinitialize(&self) -> Result<()> {
        let pool = build_pool(&self.config)?;
        let old = self.pool.swap(Arc::new(pool));
        old.close();
        tracing::warn!(address = %self.config.address(), "Redis pool rebuilt");
        Ok(())
    }

    /// One attempt: fetch a connection and run `cmd` under the socket timeout
    async fn query_once<T: FromRedisValue + Send>(&self, op: &str, cmd: &Cmd) -> Result<T> {
        let pool = self.pool.load_full();
        let mut conn = tokio::time::timeout(self.config.connect_timeout, pool.get())
            .await
            .map_err(|_| Error::timeout(format!("Redis {op}: no connection within timeout")))?
            .map_err(|e| Error::network_with_source(format!("Redis {op}: pool unavailable"), e))?;

        tokio::time::timeout(self.config.socket_timeout, cmd.query_async(&mut conn))
            .await
            .map_err(|_| Error::timeout(format!("Redis {op} exceeded socket timeout")))?
            .map_err(|e| classify(op, e))
    }

    /// Probe liveness if the last probe is stale; rebuild the pool on failure
    async fn ensure_healthy(&self) {
        {
            let mut last_probe = self.last_probe.lock().await;
            if last_probe.elapsed() < self.config.health_check_interval {
                return;
            }
            *last_probe = Instant::now();
        }

        if let Err(e) = self.query_once::<String>("PING", &redis::cmd("PING")).await {
            tracing::warn!(address = %self.config.address(), error = %e, "Redis health probe failed");
            if let Err(e) = self.reinitialize() {
                tracing::error!(error = %e, "Redis pool rebuild failed");
            }
        }
    }

    /// Full resilience path for one command
    async fn execute<T: FromRedisValue + Send>(&self, op: &str, cmd: &Cmd) -> Result<T> {
        self.ensure_healthy().await;
        let result = self.retry.execute(op, || self.query_once::<T>(op, cmd)).await;
        self.stats.track(result)
    }

    /// Round-trip check, bypassing the probe interval
    pub async fn ping(&self) -> Result<bool> {
        let cmd = redis::cmd("PING");
        let reply: String = self
            .stats
            .track(self.retry.execute("PING", || self.query_once("PING", &cmd)).await)?;
        Ok(reply.eq_ignore_ascii_case("PONG"))
    }

    fn encode(value: &Value) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(key: &str, raw: &str) -> Option<Value> {
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "undecodable remote payload treated as miss");
                None
            }
        }
    }
}

// Counter and structure primitives
impl RedisCacheBackend {
    /// Increment an integer key by `delta`
    pub async fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        let mut cmd = redis::cmd("INCRBY");
        cmd.arg(key).arg(delta);
        self.execute("INCRBY", &cmd).await
    }

    /// Decrement an integer key by `delta`
    pub async fn decr(&self, key: &str, delta: i64) -> Result<i64> {
        let mut cmd = redis::cmd("DECRBY");
        cmd.arg(key).arg(delta);
        self.execute("DECRBY", &cmd).await
    }

    /// Read one hash field
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<Value>> {
        let mut cmd = redis::cmd("HGET");
        cmd.arg(key).arg(field);
        let raw: Option<String> = self.execute("HGET", &cmd).await?;
        Ok(raw.and_then(|raw| Self::decode(key, &raw)))
    }

    /// Write one hash field; true when the field is new
    pub async fn hset(&self, key: &str, field: &str, value: &Value) -> Result<bool> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key).arg(field).arg(Self::encode(value)?);
        let added: i64 = self.execute("HSET", &cmd).await?;
        Ok(added > 0)
    }

    /// Remove one hash field; true when it existed
    pub async fn hdel(&self, key: &str, field: &str) -> Result<bool> {
        let mut cmd = redis::cmd("HDEL");
        cmd.arg(key).arg(field);
        let removed: i64 = self.execute("HDEL", &cmd).await?;
        Ok(removed > 0)
    }

    /// Every field of a hash
    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, Value>> {
        let mut cmd = redis::cmd("HGETALL");
        cmd.arg(key);
        let raw: HashMap<String, String> = self.execute("HGETALL", &cmd).await?;
        Ok(raw
            .into_iter()
            .filter_map(|(field, raw)| Self::decode(key, &raw).map(|value| (field, value)))
            .collect())
    }

    /// Prepend to a list, returning the new length
    pub async fn lpush(&self, key: &str, value: &Value) -> Result<u64> {
        let mut cmd = redis::cmd("LPUSH");
        cmd.arg(key).arg(Self::encode(value)?);
        self.execute("LPUSH", &cmd).await
    }

    /// Append to a list, returning the new length
    pub async fn rpush(&self, key: &str, value: &Value) -> Result<u64> {
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key).arg(Self::encode(value)?);
        self.execute("RPUSH", &cmd).await
    }

    /// Pop from the head of a list
    pub async fn lpop(&self, key: &str) -> Result<Option<Value>> {
        let mut cmd = redis::cmd("LPOP");
        cmd.arg(key);
        let raw: Option<String> = self.execute("LPOP", &cmd).await?;
        Ok(raw.and_then(|raw| Self::decode(key, &raw)))
    }

    /// Pop from the tail of a list
    pub async fn rpop(&self, key: &str) -> Result<Option<Value>> {
        let mut cmd = redis::cmd("RPOP");
        cmd.arg(key);
        let raw: Option<String> = self.execute("RPOP", &cmd).await?;
        Ok(raw.and_then(|raw| Self::decode(key, &raw)))
    }

    /// List length
    pub async fn llen(&self, key: &str) -> Result<u64> {
        let mut cmd = redis::cmd("LLEN");
        cmd.arg(key);
        self.execute("LLEN", &cmd).await
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        let raw: Option<String> = self.execute("GET", &cmd).await?;
        let value = raw.and_then(|raw| Self::decode(key, &raw));
        self.stats.lookup(value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(Self::encode(&value)?);
        if let Some(ttl) = ttl {
            // PX rejects 0; a sub-millisecond TTL still expires almost at once.
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        let _: () = self.execute("SET", &cmd).await?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: i64 = self.execute("DEL", &cmd).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count: i64 = self.execute("EXISTS", &cmd).await?;
        Ok(count > 0)
    }

    async fn clear(&self) -> Result<bool> {
        let _: () = self.execute("FLUSHDB", &redis::cmd("FLUSHDB")).await?;
        Ok(true)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        // Validate locally so a malformed glob fails the same way on every backend.
        KeyPattern::new(pattern)?;

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(REDIS_SCAN_BATCH);
            let (next, batch): (u64, Vec<String>) = self.execute("SCAN", &cmd).await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn stats(&self) -> BackendStats {
        self.stats.snapshot()
    }

    fn backend_name(&self) -> &str {
        REDIS_BACKEND_NAME
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("address", &self.config.address())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
