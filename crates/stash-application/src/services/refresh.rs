//! Refresh Manager
//!
//! One background worker per key: sleep for the interval, call the refresh
//! function, and write `Some(value)` through the [`StrategyManager`]
//! (keeping the key's tags). `None` leaves the cache untouched. A failure
//! is logged and followed by a fixed cooldown before the next interval;
//! the worker keeps running.
//!
//! Workers only observe their stop signal while sleeping, so a refresh or
//! write in progress always completes. Shutdown awaits each worker for a
//! bounded time and abandons (never aborts) the ones that do not finish.

use crate::services::strategy::StrategyManager;
use dashmap::DashMap;
use serde_json::Value;
use stash_domain::constants::REFRESH_ERROR_COOLDOWN_SECS;
use stash_domain::error::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct RefreshWorker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Per-key background refresh scheduler
pub struct RefreshManager {
    strategy: Arc<StrategyManager>,
    error_cooldown: Duration,
    root: CancellationToken,
    workers: DashMap<String, RefreshWorker>,
}

impl RefreshManager {
    /// Manager using the default 60 s error cooldown
    pub fn new(strategy: Arc<StrategyManager>) -> Self {
        Self::with_error_cooldown(
            strategy,
            Duration::from_secs(REFRESH_ERROR_COOLDOWN_SECS),
        )
    }

    /// Manager waiting `error_cooldown` after each failed refresh
    pub fn with_error_cooldown(strategy: Arc<StrategyManager>, error_cooldown: Duration) -> Self {
        Self {
            strategy,
            error_cooldown,
            root: CancellationToken::new(),
            workers: DashMap::new(),
        }
    }

    /// Start refreshing `key` every `interval`, replacing any existing worker
    pub fn add_refresh_task<F, Fut>(
        &self,
        key: impl Into<String>,
        refresh_fn: F,
        interval: Duration,
        ttl: Option<Duration>,
    ) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        let key = key.into();
        if interval.is_zero() {
            return Err(Error::invalid_argument(format!(
                "Refresh interval for '{key}' must be greater than zero"
            )));
        }
        if self.root.is_cancelled() {
            return Err(Error::internal("Refresh manager has been shut down"));
        }

        let token = self.root.child_token();
        let handle = tokio::spawn(run_worker(
            key.clone(),
            Arc::clone(&self.strategy),
            refresh_fn,
            interval,
            ttl,
            self.error_cooldown,
            token.clone(),
        ));

        if let Some(previous) = self.workers.insert(key.clone(), RefreshWorker { token, handle }) {
            previous.token.cancel();
            tracing::info!(key = %key, "replaced refresh task");
        } else {
            tracing::info!(key = %key, interval_ms = interval.as_millis() as u64, "added refresh task");
        }
        Ok(())
    }

    /// Signal the worker for `key` to stop; returns whether one existed
    ///
    /// The worker exits no later than its next scheduled wake.
    pub fn remove_refresh_task(&self, key: &str) -> bool {
        match self.workers.remove(key) {
            Some((_, worker)) => {
                worker.token.cancel();
                tracing::info!(key = %key, "removed refresh task");
                true
            }
            None => false,
        }
    }

    /// Keys with a running worker, sorted
    pub fn active_tasks(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.workers.iter().map(|w| w.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Stop every worker, waiting up to `timeout` for each
    ///
    /// Returns `true` when all workers stopped in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.root.cancel();
        let keys: Vec<String> = self.workers.iter().map(|w| w.key().clone()).collect();
        tracing::info!(workers = keys.len(), timeout_ms = timeout.as_millis() as u64, "stopping refresh workers");

        let mut clean = true;
        for key in keys {
            let Some((_, worker)) = self.workers.remove(&key) else {
                continue;
            };
            match tokio::time::timeout(timeout, worker.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    clean = false;
                    tracing::error!(key = %key, error = %e, "refresh worker panicked");
                }
                Err(_) => {
                    clean = false;
                    tracing::warn!(key = %key, "refresh worker did not stop in time, abandoning");
                }
            }
        }
        clean
    }
}

impl Drop for RefreshManager {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

impl std::fmt::Debug for RefreshManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshManager")
            .field("error_cooldown", &self.error_cooldown)
            .field("active_tasks", &self.active_tasks())
            .finish_non_exhaustive()
    }
}

/// Sleep for `duration` unless cancelled first; false when cancelled
async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

async fn run_worker<F, Fut>(
    key: String,
    strategy: Arc<StrategyManager>,
    refresh_fn: F,
    interval: Duration,
    ttl: Option<Duration>,
    error_cooldown: Duration,
    token: CancellationToken,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
{
    while pause(&token, interval).await {
        let outcome = match refresh_fn().await {
            Ok(Some(value)) => {
                let tags = strategy
                    .entry(&key)
                    .await
                    .map(|entry| entry.tags)
                    .unwrap_or_default();
                strategy
                    .set_with_strategy(&key, value, ttl, tags)
                    .await
                    .map(|_| tracing::debug!(key = %key, "refreshed cache entry"))
            }
            Ok(None) => {
                tracing::debug!(key = %key, "refresh produced no value, cache untouched");
                Ok(())
            }
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            tracing::warn!(
                key = %key,
                error = %e,
                cooldown_ms = error_cooldown.as_millis() as u64,
                "cache refresh failed, cooling down"
            );
            if !pause(&token, error_cooldown).await {
                break;
            }
        }
    }
    tracing::debug!(key = %key, "refresh worker stopped");
}
