//! Health check tests

use async_trait::async_trait;
use serde_json::Value;
use stash_application::CacheManager;
use stash_domain::{CacheBackend, Error, Result};
use stash_infrastructure::health::checkers::{CacheHealthChecker, SystemHealthChecker};
use stash_infrastructure::health::{HealthCheck, HealthChecker, HealthRegistry, HealthStatus};
use stash_providers::cache::{MemoryCacheBackend, NullCacheBackend};
use std::sync::Arc;
use std::time::Duration;

/// Backend refusing every call
#[derive(Debug)]
struct UnreachableBackend;

#[async_trait]
impl CacheBackend for UnreachableBackend {
    async fn get(&self, _key: &str) -> Result<Option<Value>> {
        Err(Error::network("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<bool> {
        Err(Error::network("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(Error::network("connection refused"))
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Err(Error::network("connection refused"))
    }

    async fn clear(&self) -> Result<bool> {
        Err(Error::network("connection refused"))
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>> {
        Err(Error::network("connection refused"))
    }

    fn backend_name(&self) -> &str {
        "unreachable"
    }
}

fn checker_for(backend: Arc<dyn CacheBackend>) -> CacheHealthChecker {
    let manager = CacheManager::single("health", "under-test", backend);
    CacheHealthChecker::new(manager.default_handle().clone())
}

#[tokio::test]
async fn test_cache_round_trip_is_up() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let check = checker_for(backend.clone()).check_health().await;

    assert_eq!(check.status, HealthStatus::Up);
    assert_eq!(check.name, "cache:under-test");
    assert!(backend.keys("*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_null_backend_is_degraded() {
    let check = checker_for(Arc::new(NullCacheBackend::new()))
        .check_health()
        .await;

    assert_eq!(check.status, HealthStatus::Degraded);
    assert!(check.status.is_operational());
}

#[tokio::test]
async fn test_unreachable_backend_is_down() {
    let check = checker_for(Arc::new(UnreachableBackend)).check_health().await;

    assert_eq!(check.status, HealthStatus::Down);
    assert!(check.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_system_checker_thresholds() {
    let relaxed = SystemHealthChecker::with_threshold(100.0).check_health().await;
    assert_eq!(relaxed.status, HealthStatus::Up);

    let strict = SystemHealthChecker::with_threshold(-1.0).check_health().await;
    assert_eq!(strict.status, HealthStatus::Degraded);
    assert!(strict.details.is_some());
}

struct Fixed(HealthStatus);

#[async_trait]
impl HealthChecker for Fixed {
    async fn check_health(&self) -> HealthCheck {
        match self.0 {
            HealthStatus::Up => HealthCheck::healthy("fixed"),
            HealthStatus::Degraded => HealthCheck::degraded("fixed", None),
            HealthStatus::Down => HealthCheck::failed("fixed", Some("down".into())),
        }
    }
}

#[tokio::test]
async fn test_registry_reports_worst_status() {
    let registry = HealthRegistry::new();
    registry.register_checker("a", Fixed(HealthStatus::Up)).await;
    registry.register_checker("b", Fixed(HealthStatus::Degraded)).await;

    let response = registry.perform_health_checks().await;
    assert_eq!(response.status, HealthStatus::Degraded);
    assert_eq!(response.checks.len(), 2);
    assert_eq!(response.checks["b"].name, "b");

    registry.register_checker("c", Fixed(HealthStatus::Down)).await;
    assert_eq!(
        registry.perform_health_checks().await.status,
        HealthStatus::Down
    );

    assert!(registry.unregister_checker("c").await);
    assert!(!registry.unregister_checker("c").await);
    assert_eq!(registry.list_checks().await, vec!["a", "b"]);
}

#[tokio::test]
async fn test_empty_registry_is_up() {
    let response = HealthRegistry::new().perform_health_checks().await;
    assert!(response.is_healthy());
    assert!(response.checks.is_empty());
}
