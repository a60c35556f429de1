//! Tests for the strategy manager

use crate::support::{FlakyBackend, flaky_manager, memory_manager};
use serde_json::json;
use stash_application::StrategyManager;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn strategy() -> StrategyManager {
    StrategyManager::new(memory_manager())
}

#[tokio::test]
async fn test_tag_invalidation_removes_every_tagged_key() {
    let strategy = strategy();
    strategy
        .set_with_strategy("u:1", json!({"plan": "premium"}), None, ["premium", "users"])
        .await
        .unwrap();
    strategy
        .set_with_strategy("u:2", json!({"plan": "premium"}), None, ["premium"])
        .await
        .unwrap();
    strategy
        .set_with_strategy("u:3", json!({"plan": "free"}), None, ["users"])
        .await
        .unwrap();

    assert_eq!(strategy.invalidate_by_tag("premium").await.unwrap(), 2);

    assert_eq!(strategy.get_with_strategy("u:1").await.unwrap(), None);
    assert_eq!(strategy.get_with_strategy("u:2").await.unwrap(), None);
    assert_eq!(
        strategy.get_with_strategy("u:3").await.unwrap(),
        Some(json!({"plan": "free"}))
    );
    assert!(strategy.keys_for_tag("premium").await.is_empty());
    assert_eq!(strategy.keys_for_tag("users").await, vec!["u:3"]);
}

#[tokio::test]
async fn test_unknown_tag_invalidates_nothing() {
    let strategy = strategy();
    strategy
        .set_with_strategy("k", json!(1), None, std::iter::empty::<String>())
        .await
        .unwrap();

    assert_eq!(strategy.invalidate_by_tag("nope").await.unwrap(), 0);
    assert_eq!(strategy.get_with_strategy("k").await.unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn test_rewrite_replaces_tags() {
    let strategy = strategy();
    strategy
        .set_with_strategy("k", json!(1), None, ["old"])
        .await
        .unwrap();
    strategy
        .set_with_strategy("k", json!(2), None, ["new"])
        .await
        .unwrap();

    assert_eq!(strategy.invalidate_by_tag("old").await.unwrap(), 0);
    assert_eq!(strategy.get_with_strategy("k").await.unwrap(), Some(json!(2)));
    assert_eq!(strategy.invalidate_by_tag("new").await.unwrap(), 1);
}

#[tokio::test]
async fn test_metadata_ttl_is_authoritative() {
    let manager = memory_manager();
    let strategy = StrategyManager::new(manager.clone());
    strategy
        .set_with_strategy("k", json!(1), Some(Duration::from_millis(30)), ["t"])
        .await
        .unwrap();
    // Backend copy outlives the tracked TTL.
    manager.set("k", json!(1), None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(strategy.get_with_strategy("k").await.unwrap(), None);
    assert_eq!(manager.get("k").await.unwrap(), None);
    assert!(strategy.entry("k").await.is_none());
    assert!(strategy.keys_for_tag("t").await.is_empty());
}

#[tokio::test]
async fn test_expired_read_is_absent_when_delete_fails() {
    let (backend, manager) = flaky_manager(FlakyBackend::default());
    let strategy = StrategyManager::new(manager);
    strategy
        .set_with_strategy("k", json!(1), Some(Duration::from_millis(30)), ["t"])
        .await
        .unwrap();
    backend.fail_deletes.store(true, Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(strategy.get_with_strategy("k").await.unwrap(), None);
    assert!(strategy.entry("k").await.is_none());
    assert!(strategy.keys_for_tag("t").await.is_empty());
}

#[tokio::test]
async fn test_reads_update_access_metadata() {
    let strategy = strategy();
    strategy
        .set_with_strategy("k", json!(1), None, ["t"])
        .await
        .unwrap();
    strategy.get_with_strategy("k").await.unwrap();
    strategy.get_with_strategy("k").await.unwrap();

    let entry = strategy.entry("k").await.unwrap();
    assert_eq!(entry.access_count, 2);
    assert!(entry.accessed_at >= entry.created_at);
}

#[tokio::test]
async fn test_invalidate_by_pattern() {
    let strategy = strategy();
    for key in ["user:1", "user:2", "order:1"] {
        strategy
            .set_with_strategy(key, json!(key), None, ["all"])
            .await
            .unwrap();
    }

    assert_eq!(strategy.invalidate_by_pattern("user:*").await.unwrap(), 2);
    assert_eq!(strategy.tracked_len().await, 1);
    assert_eq!(strategy.keys_for_tag("all").await, vec!["order:1"]);
}

#[tokio::test]
async fn test_invalidate_expired_sweeps_only_expired() {
    let strategy = strategy();
    strategy
        .set_with_strategy("short", json!(1), Some(Duration::from_millis(20)), ["t"])
        .await
        .unwrap();
    strategy
        .set_with_strategy("long", json!(2), Some(Duration::from_secs(60)), ["t"])
        .await
        .unwrap();
    strategy
        .set_with_strategy("forever", json!(3), None, ["t"])
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(strategy.invalidate_expired().await.unwrap(), 1);
    assert_eq!(strategy.tracked_len().await, 2);
    assert_eq!(strategy.keys_for_tag("t").await, vec!["forever", "long"]);
}

#[tokio::test]
async fn test_warm_up_loads_everything() {
    let strategy = strategy();
    let entries = (0..5).map(|i| (format!("warm:{i}"), json!(i)));

    assert_eq!(strategy.warm_up(entries, None).await.unwrap(), 5);
    assert_eq!(strategy.tracked_len().await, 5);
    assert_eq!(
        strategy.get_with_strategy("warm:3").await.unwrap(),
        Some(json!(3))
    );
}

#[tokio::test]
async fn test_delete_with_strategy_drops_metadata() {
    let strategy = strategy();
    strategy
        .set_with_strategy("k", json!(1), None, ["t"])
        .await
        .unwrap();

    assert!(strategy.delete_with_strategy("k").await.unwrap());
    assert!(!strategy.delete_with_strategy("k").await.unwrap());
    assert!(strategy.keys_for_tag("t").await.is_empty());
}

#[tokio::test]
async fn test_backend_eviction_drops_metadata() {
    let manager = memory_manager();
    let strategy = StrategyManager::new(manager.clone());
    strategy
        .set_with_strategy("k", json!(1), None, ["t"])
        .await
        .unwrap();
    manager.delete("k").await.unwrap();

    assert_eq!(strategy.get_with_strategy("k").await.unwrap(), None);
    assert_eq!(strategy.tracked_len().await, 0);
}
