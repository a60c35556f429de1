//! Health checks
//!
//! Checkers are registered by name in a [`HealthRegistry`]; running them
//! yields a [`HealthResponse`] whose status is the worst individual status.
//!
//! | Checker | Up | Degraded | Down |
//! |---------|----|----------|------|
//! | [`checkers::CacheHealthChecker`] | probe written and read back | probe written, not read back | backend error |
//! | [`checkers::SystemHealthChecker`] | memory below threshold | memory above threshold | - |

use crate::logging::log_health_check;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Health status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Fully operational
    Up,
    /// Operational with reduced guarantees
    Degraded,
    /// Not operational
    Down,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Up)
    }

    /// Healthy or degraded
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Up | Self::Degraded)
    }
}

/// Individual health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: u64,
    pub error: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl HealthCheck {
    fn with_status<S: Into<String>>(name: S, status: HealthStatus, error: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            timestamp: chrono::Utc::now(),
            response_time_ms: 0,
            error,
            details: None,
        }
    }

    /// Create a successful health check
    pub fn healthy<S: Into<String>>(name: S) -> Self {
        Self::with_status(name, HealthStatus::Up, None)
    }

    /// Create a failed health check
    pub fn failed<S: Into<String>>(name: S, error: Option<String>) -> Self {
        Self::with_status(name, HealthStatus::Down, error)
    }

    /// Create a degraded health check
    pub fn degraded<S: Into<String>>(name: S, reason: Option<String>) -> Self {
        Self::with_status(name, HealthStatus::Degraded, reason)
    }

    #[must_use]
    pub fn with_response_time(mut self, duration: Duration) -> Self {
        self.response_time_ms = duration.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Overall health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: u64,
    pub checks: BTreeMap<String, HealthCheck>,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthResponse {
    pub fn new() -> Self {
        Self {
            status: HealthStatus::Up,
            timestamp: chrono::Utc::now(),
            response_time_ms: 0,
            checks: BTreeMap::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Add a result, downgrading the overall status if needed
    #[must_use]
    pub fn add_check(mut self, check: HealthCheck) -> Self {
        if check.status == HealthStatus::Down {
            self.status = HealthStatus::Down;
        } else if check.status == HealthStatus::Degraded && self.status == HealthStatus::Up {
            self.status = HealthStatus::Degraded;
        }
        self.checks.insert(check.name.clone(), check);
        self
    }

    #[must_use]
    pub fn with_response_time(mut self, duration: Duration) -> Self {
        self.response_time_ms = duration.as_millis() as u64;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Health check function trait
///
/// # Example
///
/// ```no_run
/// use stash_infrastructure::health::{HealthChecker, HealthCheck};
/// use async_trait::async_trait;
///
/// struct UpstreamApi;
///
/// #[async_trait]
/// impl HealthChecker for UpstreamApi {
///     async fn check_health(&self) -> HealthCheck {
///         HealthCheck::healthy("upstream")
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    /// Perform a health check
    async fn check_health(&self) -> HealthCheck;
}

/// Named health checkers
#[derive(Clone)]
pub struct HealthRegistry {
    checkers: Arc<RwLock<BTreeMap<String, Arc<dyn HealthChecker>>>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            checkers: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Register a checker, replacing any under the same name
    pub async fn register_checker<C>(&self, name: impl Into<String>, checker: C)
    where
        C: HealthChecker + 'static,
    {
        self.checkers
            .write()
            .await
            .insert(name.into(), Arc::new(checker));
    }

    pub async fn unregister_checker(&self, name: &str) -> bool {
        self.checkers.write().await.remove(name).is_some()
    }

    /// Run every registered checker in name order
    pub async fn perform_health_checks(&self) -> HealthResponse {
        let start_time = Instant::now();
        // Snapshot so no lock is held while checks run.
        let checkers: Vec<(String, Arc<dyn HealthChecker>)> = self
            .checkers
            .read()
            .await
            .iter()
            .map(|(name, checker)| (name.clone(), Arc::clone(checker)))
            .collect();

        let mut response = HealthResponse::new();
        for (name, checker) in checkers {
            let mut check = checker.check_health().await;
            check.name = name;
            log_health_check(&check.name, check.status.is_healthy(), check.error.as_deref());
            response = response.add_check(check);
        }
        response.with_response_time(start_time.elapsed())
    }

    pub async fn list_checks(&self) -> Vec<String> {
        self.checkers.read().await.keys().cloned().collect()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthRegistry").finish_non_exhaustive()
    }
}

/// Built-in health checkers
pub mod checkers {
    use super::{HealthCheck, HealthChecker, HealthStatus};
    use crate::constants::{HEALTH_MEMORY_THRESHOLD_PERCENT, HEALTH_PROBE_TTL_SECS};
    use serde_json::json;
    use stash_application::CacheHandle;
    use stash_domain::constants::HEALTH_CHECK_KEY;
    use std::time::{Duration, Instant};
    use sysinfo::{MemoryRefreshKind, RefreshKind, System};

    /// Round trip through one cache backend
    ///
    /// Writes a short-lived probe, reads it back and deletes it.
    #[derive(Debug, Clone)]
    pub struct CacheHealthChecker {
        handle: CacheHandle,
    }

    impl CacheHealthChecker {
        pub fn new(handle: CacheHandle) -> Self {
            Self { handle }
        }
    }

    #[async_trait::async_trait]
    impl HealthChecker for CacheHealthChecker {
        async fn check_health(&self) -> HealthCheck {
            let start_time = Instant::now();
            let name = format!("cache:{}", self.handle.name());
            let probe = json!({ "probe": chrono::Utc::now().timestamp_millis() });
            let ttl = Some(Duration::from_secs(HEALTH_PROBE_TTL_SECS));

            if let Err(e) = self.handle.set(HEALTH_CHECK_KEY, probe.clone(), ttl).await {
                return HealthCheck::failed(name, Some(e.to_string()))
                    .with_response_time(start_time.elapsed());
            }
            let read_back = match self.handle.get(HEALTH_CHECK_KEY).await {
                Ok(value) => value,
                Err(e) => {
                    return HealthCheck::failed(name, Some(e.to_string()))
                        .with_response_time(start_time.elapsed());
                }
            };
            if let Err(e) = self.handle.delete(HEALTH_CHECK_KEY).await {
                tracing::warn!(backend = %self.handle.name(), error = %e, "failed to remove health probe");
            }

            let details = json!({ "backend": self.handle.backend().backend_name() });
            let check = if read_back.as_ref() == Some(&probe) {
                HealthCheck::healthy(name)
            } else {
                HealthCheck::degraded(name, Some("probe value was not read back".to_string()))
            };
            check
                .with_details(details)
                .with_response_time(start_time.elapsed())
        }
    }

    /// Host memory pressure
    #[derive(Debug, Clone)]
    pub struct SystemHealthChecker {
        memory_threshold_percent: f64,
    }

    impl Default for SystemHealthChecker {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SystemHealthChecker {
        /// Degraded above 90% memory usage
        pub fn new() -> Self {
            Self::with_threshold(HEALTH_MEMORY_THRESHOLD_PERCENT)
        }

        pub fn with_threshold(memory_threshold_percent: f64) -> Self {
            Self {
                memory_threshold_percent,
            }
        }
    }

    #[async_trait::async_trait]
    impl HealthChecker for SystemHealthChecker {
        async fn check_health(&self) -> HealthCheck {
            let start_time = Instant::now();
            let sys = System::new_with_specifics(
                RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
            );

            let total_memory = sys.total_memory();
            let used_memory = sys.used_memory();
            let memory_percent = if total_memory > 0 {
                (used_memory as f64 / total_memory as f64) * 100.0
            } else {
                0.0
            };

            let status = if memory_percent > self.memory_threshold_percent {
                HealthStatus::Degraded
            } else {
                HealthStatus::Up
            };
            let error = (status == HealthStatus::Degraded).then(|| {
                format!(
                    "memory usage {memory_percent:.1}% above {:.1}%",
                    self.memory_threshold_percent
                )
            });

            HealthCheck {
                name: "system".to_string(),
                status,
                timestamp: chrono::Utc::now(),
                response_time_ms: start_time.elapsed().as_millis() as u64,
                error,
                details: Some(json!({
                    "memory_used_bytes": used_memory,
                    "memory_total_bytes": total_memory,
                    "memory_usage_percent": memory_percent,
                    "memory_threshold_percent": self.memory_threshold_percent,
                })),
            }
        }
    }
}
