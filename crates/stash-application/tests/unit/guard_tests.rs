//! Tests for the penetration guard

use crate::support::memory_manager;
use futures::future::join_all;
use serde_json::json;
use stash_application::PenetrationGuard;
use stash_domain::Error;
use stash_domain::constants::NULL_VALUE_MARKER;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_fetch_once() {
    let guard = Arc::new(PenetrationGuard::new(memory_manager()));
    let fetches = Arc::new(AtomicUsize::new(0));

    let callers = (0..16).map(|_| {
        let guard = Arc::clone(&guard);
        let fetches = Arc::clone(&fetches);
        tokio::spawn(async move {
            guard
                .get_with_protection(
                    "product:7",
                    || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(Some(json!({"id": 7})))
                    },
                    None,
                )
                .await
        })
    });

    for result in join_all(callers).await {
        assert_eq!(result.unwrap().unwrap(), Some(json!({"id": 7})));
    }
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(guard.in_flight(), 0);
}

#[tokio::test]
async fn test_hit_skips_fetch() {
    let manager = memory_manager();
    manager.set("k", json!("cached"), None).await.unwrap();
    let guard = PenetrationGuard::new(manager);
    let fetches = AtomicUsize::new(0);

    let value = guard
        .get_with_protection(
            "k",
            || async {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(value, Some(json!("cached")));
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_absent_key_is_shielded_by_null_marker() {
    let manager = memory_manager();
    let guard = PenetrationGuard::new(Arc::clone(&manager));
    let fetches = AtomicUsize::new(0);

    for _ in 0..3 {
        let value = guard
            .get_with_protection(
                "ghost",
                || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(
        manager.get("ghost").await.unwrap(),
        Some(json!(NULL_VALUE_MARKER))
    );
}

#[tokio::test(start_paused = true)]
async fn test_null_marker_expires_after_null_ttl() {
    let guard = PenetrationGuard::with_null_ttl(memory_manager(), Duration::from_secs(5));
    let fetches = AtomicUsize::new(0);
    let fetch = || async {
        fetches.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Error>(None)
    };

    guard.get_with_protection("ghost", fetch, None).await.unwrap();
    tokio::time::advance(Duration::from_secs(6)).await;
    guard.get_with_protection("ghost", fetch, None).await.unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fetch_errors_are_not_cached() {
    let guard = PenetrationGuard::new(memory_manager());

    let first = guard
        .get_with_protection("k", || async { Err(Error::network("db down")) }, None)
        .await;
    assert!(first.is_err());
    assert_eq!(guard.in_flight(), 0);

    let second = guard
        .get_with_protection("k", || async { Ok(Some(json!(1))) }, None)
        .await
        .unwrap();
    assert_eq!(second, Some(json!(1)));
}

#[tokio::test(start_paused = true)]
async fn test_fetched_value_uses_caller_ttl() {
    let manager = memory_manager();
    let guard = PenetrationGuard::new(Arc::clone(&manager));

    guard
        .get_with_protection("k", || async { Ok(Some(json!(1))) }, Some(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(manager.get("k").await.unwrap(), Some(json!(1)));

    tokio::time::advance(Duration::from_secs(3)).await;
    assert_eq!(manager.get("k").await.unwrap(), None);
}
