//! Cache configuration types
//!
//! Durations are whole seconds on the wire (`default_ttl_secs = 300`) and
//! become [`Duration`]s when handed to the backends.

use crate::constants::{
    DEFAULT_CACHE_BACKEND, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT, REDIS_CONNECT_TIMEOUT_SECS,
    REDIS_HEALTH_CHECK_INTERVAL_SECS, REDIS_POOL_SIZE, REDIS_SOCKET_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use stash_domain::constants::DEFAULT_CACHE_PREFIX;
use stash_domain::error::Result;
use stash_domain::value_objects::{
    BackendConfig, BackendKind, FileBackendConfig, MemoryBackendConfig, RemoteBackendConfig,
};
use std::path::PathBuf;
use std::time::Duration;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false every backend is replaced by the null backend
    pub enabled: bool,

    /// Default backend (`memory`, `file`, `remote`, `null`)
    pub backend: String,

    /// Further backends reachable through `CacheManager::using`
    pub extra_backends: Vec<String>,

    /// Key prefix, joined to keys with `:`
    pub prefix: String,

    /// TTL applied when a write passes none; unset means no expiry
    pub default_ttl_secs: Option<u64>,

    /// In-memory backend
    pub memory: MemoryCacheConfig,

    /// On-disk backend
    pub file: FileCacheConfig,

    /// Redis backend
    pub remote: RemoteCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: DEFAULT_CACHE_BACKEND.to_string(),
            extra_backends: Vec::new(),
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            default_ttl_secs: None,
            memory: MemoryCacheConfig::default(),
            file: FileCacheConfig::default(),
            remote: RemoteCacheConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Kind of the default backend; `null` when caching is disabled
    pub fn backend_kind(&self) -> Result<BackendKind> {
        if !self.enabled {
            return Ok(BackendKind::Null);
        }
        self.backend.parse()
    }

    /// Every backend to build, default first, without duplicates
    pub fn backend_kinds(&self) -> Result<Vec<BackendKind>> {
        let mut kinds = vec![self.backend_kind()?];
        if self.enabled {
            for name in &self.extra_backends {
                let kind: BackendKind = name.parse()?;
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }
        Ok(kinds)
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }

    /// Construction settings for the backend registry
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            memory: MemoryBackendConfig {
                max_entries: self.memory.max_entries,
            },
            file: self.file.directory.clone().map(FileBackendConfig::new),
            remote: self.remote.to_backend_config(),
        }
    }
}

/// In-memory backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries before eviction
    pub max_entries: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: MemoryBackendConfig::default().max_entries,
        }
    }
}

/// On-disk backend configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileCacheConfig {
    /// Directory holding one file per key; required by the `file` backend
    pub directory: Option<PathBuf>,
}

/// Redis backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCacheConfig {
    pub host: String,
    pub port: u16,
    pub database: i64,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Connection pool size
    pub max_pool_size: usize,

    pub connect_timeout_secs: u64,
    pub socket_timeout_secs: u64,

    /// Seconds between connection probes
    pub health_check_interval_secs: u64,
}

impl Default for RemoteCacheConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT,
            database: 0,
            username: None,
            password: None,
            max_pool_size: REDIS_POOL_SIZE,
            connect_timeout_secs: REDIS_CONNECT_TIMEOUT_SECS,
            socket_timeout_secs: REDIS_SOCKET_TIMEOUT_SECS,
            health_check_interval_secs: REDIS_HEALTH_CHECK_INTERVAL_SECS,
        }
    }
}

impl RemoteCacheConfig {
    pub fn to_backend_config(&self) -> RemoteBackendConfig {
        RemoteBackendConfig::new(self.host.clone(), self.port)
            .with_database(self.database)
            .with_credentials(self.username.clone(), self.password.clone())
            .with_max_pool_size(self.max_pool_size)
            .with_timeouts(
                Duration::from_secs(self.connect_timeout_secs),
                Duration::from_secs(self.socket_timeout_secs),
            )
            .with_health_check_interval(Duration::from_secs(self.health_check_interval_secs))
    }
}
