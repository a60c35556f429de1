//! Strategy-tracked cache entry
//!
//! Metadata kept alongside a cached value so that time- and tag-based
//! invalidation can be decided without asking the backend.

use serde_json::Value;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A cached value plus the bookkeeping needed for strategy decisions
///
/// An entry without a TTL never expires by time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Caller-visible key (without manager prefix)
    pub key: String,
    /// Stored payload
    pub value: Value,
    /// When the entry was written
    pub created_at: Instant,
    /// Last successful read
    pub accessed_at: Instant,
    /// Number of successful reads
    pub access_count: u64,
    /// Time to live, `None` for no expiry
    pub ttl: Option<Duration>,
    /// Tags the entry is indexed under
    pub tags: HashSet<String>,
}

impl CacheEntry {
    /// Create a fresh entry stamped with the current instant
    pub fn new<I, S>(key: impl Into<String>, value: Value, ttl: Option<Duration>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Instant::now();
        Self {
            key: key.into(),
            value,
            created_at: now,
            accessed_at: now,
            access_count: 0,
            ttl,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Instant at which the entry stops being served
    pub fn expires_at(&self) -> Option<Instant> {
        self.ttl.map(|ttl| self.created_at + ttl)
    }

    /// Whether the entry has expired as of now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Whether the entry has expired as of `now`
    ///
    /// Expiry is inclusive: at exactly `created_at + ttl` the entry is gone.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|deadline| now >= deadline)
    }

    /// Record a successful read
    pub fn touch(&mut self) {
        self.accessed_at = Instant::now();
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Whether the entry carries `tag`
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Remaining lifetime, `None` when the entry never expires
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
