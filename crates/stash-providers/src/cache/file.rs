//! On-disk file cache backend
//!
//! One file per key under a configured directory. The file name is
//! `hex(sha256(key)).json` and the content is an envelope:
//!
//! ```json
//! {"key": "stash:u:1", "value": {"name": "Ann"}, "expires_at": "2026-01-01T00:00:02Z", "created_at": "2026-01-01T00:00:00Z"}
//! ```
//!
//! Writes go to a temporary sibling and are renamed into place, so a reader
//! sees either the old envelope or the new one. An envelope that cannot be
//! read or decoded is a miss for every [`CacheBackend`] operation (logged,
//! file removed where possible); only [`FileCacheBackend::get_strict`]
//! reports it, as [`Error::CorruptEntry`](stash_domain::Error::CorruptEntry)
//! or [`Error::Io`](stash_domain::Error::Io).

use crate::cache::pattern::KeyPattern;
use crate::cache::stats::StatsRecorder;
use crate::constants::{FILE_ENVELOPE_EXTENSION, FILE_TEMP_EXTENSION};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use stash_domain::error::{Error, Result};
use stash_domain::ports::providers::cache::{BackendStats, CacheBackend};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// On-disk representation of one cached value
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    key: String,
    value: Value,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Envelope {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Utc::now() >= deadline)
    }
}

/// Outcome of reading one envelope file
#[derive(Debug)]
enum EnvelopeRead {
    Found(Envelope),
    Absent,
    Corrupt(String),
    Unreadable(std::io::Error),
}

/// File-per-key backend
#[derive(Debug)]
pub struct FileCacheBackend {
    directory: PathBuf,
    temp_counter: AtomicU64,
    stats: StatsRecorder,
}

impl FileCacheBackend {
    /// Open (creating if needed) a cache rooted at `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|e| {
            Error::io_with_source(
                format!("Failed to create cache directory {}", directory.display()),
                e,
            )
        })?;
        tracing::debug!(directory = %directory.display(), "file cache opened");
        Ok(Self {
            directory,
            temp_counter: AtomicU64::new(0),
            stats: StatsRecorder::new(),
        })
    }

    /// Root directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the envelope file for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.directory
            .join(format!("{}.{FILE_ENVELOPE_EXTENSION}", hex::encode(digest)))
    }

    /// Like [`CacheBackend::get`], but an undecodable envelope is an error
    pub async fn get_strict(&self, key: &str) -> Result<Option<Value>> {
        self.stats.operation();
        let path = self.path_for(key);
        match self.read_envelope(&path).await {
            EnvelopeRead::Found(envelope) if !envelope.is_expired() => {
                self.stats.lookup(true);
                Ok(Some(envelope.value))
            }
            EnvelopeRead::Found(_) => {
                self.discard(&path).await;
                self.stats.lookup(false);
                Ok(None)
            }
            EnvelopeRead::Absent => {
                self.stats.lookup(false);
                Ok(None)
            }
            EnvelopeRead::Corrupt(reason) => {
                self.stats.error();
                Err(Error::corrupt_entry(key, reason))
            }
            EnvelopeRead::Unreadable(e) => {
                self.stats.error();
                Err(Error::io_with_source(
                    format!("Failed to read {}", path.display()),
                    e,
                ))
            }
        }
    }

    async fn read_envelope(&self, path: &Path) -> EnvelopeRead {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return EnvelopeRead::Absent,
            Err(e) => return EnvelopeRead::Unreadable(e),
        };
        match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) => EnvelopeRead::Found(envelope),
            Err(e) => EnvelopeRead::Corrupt(e.to_string()),
        }
    }

    /// Live envelope at `path`; expired, corrupt and unreadable files are
    /// discarded and read as absent
    async fn load_path(&self, path: &Path) -> Option<Envelope> {
        match self.read_envelope(path).await {
            EnvelopeRead::Found(envelope) if !envelope.is_expired() => Some(envelope),
            EnvelopeRead::Found(_) => {
                self.discard(path).await;
                None
            }
            EnvelopeRead::Absent => None,
            EnvelopeRead::Corrupt(reason) => {
                tracing::warn!(path = %path.display(), error = %reason, "discarding corrupt cache file");
                self.discard(path).await;
                None
            }
            EnvelopeRead::Unreadable(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable cache file");
                self.discard(path).await;
                None
            }
        }
    }

    async fn load(&self, key: &str) -> Option<Envelope> {
        self.load_path(&self.path_for(key)).await
    }

    /// Best-effort removal of a stale or unreadable file
    async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove cache file");
            }
        }
    }

    async fn write_envelope(&self, envelope: &Envelope) -> Result<()> {
        let path = self.path_for(&envelope.key);
        let payload = serde_json::to_vec(envelope)?;
        let sequence = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        let temp = path.with_extension(format!(
            "{}.{sequence}.{FILE_TEMP_EXTENSION}",
            std::process::id()
        ));

        tokio::fs::write(&temp, &payload).await.map_err(|e| {
            Error::io_with_source(format!("Failed to write {}", temp.display()), e)
        })?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            self.discard(&temp).await;
            return Err(Error::io_with_source(
                format!("Failed to move cache file into {}", path.display()),
                e,
            ));
        }
        Ok(())
    }

    /// Paths of every envelope file in the directory
    async fn envelope_paths(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.directory).await.map_err(|e| {
            Error::io_with_source(
                format!("Failed to list {}", self.directory.display()),
                e,
            )
        })?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext == FILE_ENVELOPE_EXTENSION)
            {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl CacheBackend for FileCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.stats.operation();
        let value = self.load(key).await.map(|envelope| envelope.value);
        self.stats.lookup(value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<bool> {
        let created_at = Utc::now();
        let expires_at = match ttl {
            Some(ttl) => Some(
                created_at
                    + chrono::Duration::from_std(ttl)
                        .map_err(|e| Error::invalid_argument(format!("TTL out of range: {e}")))?,
            ),
            None => None,
        };
        let envelope = Envelope {
            key: key.to_string(),
            value,
            expires_at,
            created_at,
        };
        self.stats.track(self.write_envelope(&envelope).await)?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.stats.operation();
        let path = self.path_for(key);
        let existed = match self.read_envelope(&path).await {
            EnvelopeRead::Found(envelope) => !envelope.is_expired(),
            EnvelopeRead::Absent => return Ok(false),
            EnvelopeRead::Corrupt(reason) => {
                tracing::warn!(key = %key, error = %reason, "deleting corrupt cache file");
                false
            }
            EnvelopeRead::Unreadable(e) => {
                tracing::warn!(key = %key, error = %e, "discarding unreadable cache file");
                self.discard(&path).await;
                return Ok(false);
            }
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(existed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(existed),
            Err(e) => {
                self.stats.error();
                Err(Error::io_with_source(
                    format!("Failed to remove {}", path.display()),
                    e,
                ))
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.stats.operation();
        Ok(self.load(key).await.is_some())
    }

    async fn clear(&self) -> Result<bool> {
        let paths = self.stats.track(self.envelope_paths().await)?;
        for path in paths {
            self.discard(&path).await;
        }
        Ok(true)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = self.stats.track(KeyPattern::new(pattern))?;
        let paths = self.envelope_paths().await?;
        let mut keys = Vec::new();
        for path in paths {
            if let Some(envelope) = self.load_path(&path).await {
                if pattern.matches(&envelope.key) {
                    keys.push(envelope.key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn stats(&self) -> BackendStats {
        self.stats.snapshot()
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}
