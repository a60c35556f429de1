//! Backend selection and construction settings

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Known backend kinds
///
/// The set is closed: a backend is chosen by kind once at startup, and
/// every kind maps to exactly one constructor in the provider registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process memory store
    Memory,
    /// One file per key on local disk
    File,
    /// Remote Redis-protocol key-value store
    Remote,
    /// Stores nothing (caching disabled)
    Null,
}

impl BackendKind {
    /// Every supported kind, in registry order
    pub const ALL: [BackendKind; 4] = [Self::Memory, Self::File, Self::Remote, Self::Null];

    /// Canonical name used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Remote => "remote",
            Self::Null => "null",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Memory => "In-process memory cache with per-entry TTL",
            Self::File => "On-disk cache, one hashed file per key",
            Self::Remote => "Redis-protocol remote store with pooled connections",
            Self::Null => "No-op cache that never stores anything",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "moka" => Ok(Self::Memory),
            "file" | "disk" => Ok(Self::File),
            "remote" | "redis" => Ok(Self::Remote),
            "null" | "none" => Ok(Self::Null),
            other => {
                let available: Vec<&str> = Self::ALL.iter().map(BackendKind::as_str).collect();
                Err(Error::configuration(format!(
                    "Unknown cache backend '{other}'. Available backends: {available:?}"
                )))
            }
        }
    }
}

/// In-memory backend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBackendConfig {
    /// Upper bound on stored entries
    pub max_entries: u64,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
        }
    }
}

/// On-disk backend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBackendConfig {
    /// Directory holding one envelope file per key
    pub directory: PathBuf,
}

impl FileBackendConfig {
    /// Settings rooted at `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

/// Remote key-value store settings
///
/// Immutable once handed to the driver; the driver builds (and, after a
/// failed health probe, rebuilds) its single pool from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBackendConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Logical database index
    pub database: i64,
    /// ACL user name
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Maximum pooled connections
    pub max_pool_size: usize,
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Time allowed for a single command round trip
    pub socket_timeout: Duration,
    /// Minimum spacing between liveness probes
    pub health_check_interval: Duration,
}

impl RemoteBackendConfig {
    /// Settings for `host:port` with remaining defaults
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Select the logical database
    pub fn with_database(mut self, database: i64) -> Self {
        self.database = database;
        self
    }

    /// Set credentials
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Set the maximum pool size
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set connect and socket timeouts
    pub fn with_timeouts(mut self, connect: Duration, socket: Duration) -> Self {
        self.connect_timeout = connect;
        self.socket_timeout = socket;
        self
    }

    /// Set the liveness probe interval
    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Address for logs; never includes credentials
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl Default for RemoteBackendConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: 0,
            username: None,
            password: None,
            max_pool_size: 10,
            connect_timeout: Duration::from_secs(5),
            socket_timeout: Duration::from_secs(5),
            health_check_interval: Duration::from_secs(30),
        }
    }
}

/// Everything the provider registry needs to build any backend kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// In-memory settings
    pub memory: MemoryBackendConfig,
    /// On-disk settings, required for [`BackendKind::File`]
    pub file: Option<FileBackendConfig>,
    /// Remote settings
    pub remote: RemoteBackendConfig,
}
