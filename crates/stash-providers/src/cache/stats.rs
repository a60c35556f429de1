//! Lock-free operation counters shared by the backends

use stash_domain::BackendStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters behind [`CacheBackend::stats`](stash_domain::CacheBackend::stats)
#[derive(Debug, Default)]
pub struct StatsRecorder {
    operations: AtomicU64,
    errors: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one operation
    pub fn operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one failed operation
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a read by outcome
    pub fn lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count the outcome of a fallible operation, passing it through
    pub fn track<T, E>(&self, result: Result<T, E>) -> Result<T, E> {
        self.operation();
        if result.is_err() {
            self.error();
        }
        result
    }

    /// Current values
    pub fn snapshot(&self) -> BackendStats {
        BackendStats {
            operations: self.operations.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
