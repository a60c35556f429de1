//! Tests for the cache manager

use crate::support::{FlakyBackend, flaky_manager, memory_manager};
use serde::{Deserialize, Serialize};
use serde_json::json;
use stash_application::CacheManager;
use stash_domain::{CacheBackend, Error};
use stash_providers::cache::{MemoryCacheBackend, NullCacheBackend};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_value_absent_after_ttl() {
    let manager = memory_manager();
    manager
        .set("u:1", json!({"name": "Ann"}), Some(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(
        manager.get("u:1").await.unwrap(),
        Some(json!({"name": "Ann"}))
    );

    tokio::time::advance(Duration::from_secs(3)).await;
    assert_eq!(manager.get("u:1").await.unwrap(), None);
}

#[tokio::test]
async fn test_keys_are_prefixed_in_backend() {
    let backend = Arc::new(MemoryCacheBackend::new());
    let manager = CacheManager::single("app", "memory", backend.clone());
    manager.set("u:1", json!(1), None).await.unwrap();

    assert!(backend.exists("app:u:1").await.unwrap());
    assert!(!backend.exists("u:1").await.unwrap());
    assert_eq!(manager.keys("u:*").await.unwrap(), vec!["u:1"]);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let manager = memory_manager();
    manager.set("k", json!("v"), None).await.unwrap();

    assert!(manager.delete("k").await.unwrap());
    assert!(!manager.delete("k").await.unwrap());
    assert!(!manager.exists("k").await.unwrap());
}

#[tokio::test]
async fn test_get_or_falls_back_on_miss() {
    let manager = memory_manager();
    assert_eq!(
        manager.get_or("missing", json!("fallback")).await.unwrap(),
        json!("fallback")
    );
}

#[tokio::test]
async fn test_remember_computes_once_then_serves_cache() {
    let manager = memory_manager();
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let value = manager
            .remember(
                "expensive",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!(42))
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(value, json!(42));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remember_returns_value_when_write_back_fails() {
    let (_backend, manager) = flaky_manager(FlakyBackend::failing_writes());

    let value = manager
        .remember("k", || async { Ok(json!("computed")) }, None)
        .await
        .unwrap();

    assert_eq!(value, json!("computed"));
    assert_eq!(manager.metrics().errors, 1);
}

#[tokio::test]
async fn test_remember_propagates_compute_error() {
    let manager = memory_manager();
    let result = manager
        .remember("k", || async { Err(Error::internal("loader down")) }, None)
        .await;

    assert!(result.is_err());
    assert_eq!(manager.get("k").await.unwrap(), None);
}

#[test]
fn test_unknown_default_backend_fails_fast() {
    let mut backends: HashMap<String, Arc<dyn CacheBackend>> = HashMap::new();
    backends.insert("memory".to_string(), Arc::new(MemoryCacheBackend::new()));

    let err = CacheManager::new("app", "remote", backends).unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_using_selects_backend_by_name() {
    let mut backends: HashMap<String, Arc<dyn CacheBackend>> = HashMap::new();
    backends.insert("memory".to_string(), Arc::new(MemoryCacheBackend::new()));
    backends.insert("null".to_string(), Arc::new(NullCacheBackend::new()));
    let manager = CacheManager::new("app", "memory", backends).unwrap();

    let null = manager.using("null").unwrap();
    null.set("k", json!(1), None).await.unwrap();
    assert_eq!(null.get("k").await.unwrap(), None);

    manager.set("k", json!(1), None).await.unwrap();
    assert_eq!(manager.get("k").await.unwrap(), Some(json!(1)));

    assert!(manager.using("file").unwrap_err().is_configuration());
    assert_eq!(manager.backend_names(), vec!["memory", "null"]);
}

#[tokio::test]
async fn test_counters_track_hits_misses_and_errors() {
    let (backend, manager) = flaky_manager(FlakyBackend::default());
    manager.set("k", json!(1), None).await.unwrap();
    manager.get("k").await.unwrap();
    manager.get("missing").await.unwrap();
    backend.fail_reads.store(true, Ordering::SeqCst);
    assert!(manager.get("k").await.is_err());

    let counters = manager.metrics();
    assert_eq!(counters.hits, 1);
    assert_eq!(counters.misses, 1);
    assert_eq!(counters.errors, 1);
    assert_eq!(counters.operations, 4);
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
}

#[tokio::test]
async fn test_typed_helpers() {
    let manager = memory_manager();
    let user = User {
        name: "Ann".into(),
        age: 31,
    };
    manager.set_as("u:1", &user, None).await.unwrap();

    assert_eq!(manager.get_as::<User>("u:1").await.unwrap(), Some(user));

    manager.set("u:2", json!("not a user"), None).await.unwrap();
    assert_eq!(manager.get_as::<User>("u:2").await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_default_ttl_applies_when_none_given() {
    let manager = CacheManager::with_default_ttl(
        "app",
        "memory",
        HashMap::from([(
            "memory".to_string(),
            Arc::new(MemoryCacheBackend::new()) as Arc<dyn CacheBackend>,
        )]),
        Some(Duration::from_secs(1)),
    )
    .unwrap();
    manager.set("k", json!(1), None).await.unwrap();
    manager
        .set("pinned", json!(2), Some(Duration::from_secs(10)))
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(manager.get("k").await.unwrap(), None);
    assert_eq!(manager.get("pinned").await.unwrap(), Some(json!(2)));
}
