//! Tests for metrics collection and alerting

use crate::support::{FixedSystemMetrics, memory_manager};
use serde_json::json;
use stash_application::{CacheManager, CacheMonitor, MonitorConfig, StrategyManager};
use stash_domain::{AlertLevel, Comparison, Error, Metric, ThresholdRule};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn monitor(cache: Arc<CacheManager>, memory_percent: f64) -> CacheMonitor {
    CacheMonitor::new(
        cache,
        Arc::new(FixedSystemMetrics(memory_percent)),
        MonitorConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_healthy_cache_raises_no_alerts() {
    let cache = memory_manager();
    cache.set("k", json!(1), None).await.unwrap();
    cache.get("k").await.unwrap();
    let monitor = monitor(cache, 40.0);

    let snapshot = monitor.collect_metrics().await;
    assert_eq!(snapshot.hits, 1);
    assert_eq!(snapshot.misses, 0);
    assert!((snapshot.hit_rate - 1.0).abs() < f64::EPSILON);
    assert!(monitor.check_alerts(&snapshot).await.is_empty());
}

#[tokio::test]
async fn test_idle_cache_raises_no_rate_alerts() {
    let monitor = monitor(memory_manager(), 10.0);

    let snapshot = monitor.collect_metrics().await;
    assert_eq!(snapshot.operations, 0);
    assert!(monitor.check_alerts(&snapshot).await.is_empty());
}

#[tokio::test]
async fn test_low_hit_rate_and_high_memory_alert() {
    let cache = memory_manager();
    cache.set("k", json!(1), None).await.unwrap();
    cache.get("k").await.unwrap();
    for key in ["a", "b", "c"] {
        cache.get(key).await.unwrap();
    }
    let monitor = monitor(cache, 95.0);

    let snapshot = monitor.collect_metrics().await;
    assert!((snapshot.hit_rate - 0.25).abs() < 1e-9);

    let alerts = monitor.check_alerts(&snapshot).await;
    let mut levels: Vec<AlertLevel> = alerts.iter().map(|a| a.level).collect();
    levels.sort();
    assert_eq!(levels, vec![AlertLevel::Warning, AlertLevel::Critical]);
    assert!(alerts.iter().any(|a| a.message.contains("hit rate")));
    assert_eq!(monitor.alerts().await.len(), 2);
}

#[tokio::test]
async fn test_failing_callback_does_not_block_others() {
    let monitor = monitor(memory_manager(), 99.0);
    let delivered = Arc::new(AtomicUsize::new(0));

    monitor
        .on_alert(|_| Err(Error::internal("pager offline")))
        .await;
    let counter = Arc::clone(&delivered);
    monitor
        .on_alert(move |alert| {
            assert_eq!(alert.level, AlertLevel::Critical);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    let snapshot = monitor.collect_metrics().await;
    let alerts = monitor.check_alerts(&snapshot).await;

    assert_eq!(alerts.len(), 1);
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_custom_rule_is_evaluated() {
    let cache = memory_manager();
    cache.set("k", json!(1), None).await.unwrap();
    let monitor = monitor(cache, 10.0);
    monitor
        .add_rule(ThresholdRule::new(
            Metric::Operations,
            Comparison::GreaterOrEqual,
            1.0,
            AlertLevel::Info,
        ))
        .await;
    assert_eq!(monitor.rules().await.len(), 5);

    let snapshot = monitor.collect_metrics().await;
    let alerts = monitor.check_alerts(&snapshot).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::Info);
}

#[tokio::test]
async fn test_history_is_bounded_and_exported() {
    let cache = memory_manager();
    let monitor = CacheMonitor::new(
        Arc::clone(&cache),
        Arc::new(FixedSystemMetrics(10.0)),
        MonitorConfig {
            history_limit: 3,
            ..MonitorConfig::default()
        },
    )
    .unwrap();

    for _ in 0..5 {
        cache.get("missing").await.unwrap();
        monitor.collect_metrics().await;
    }

    let report = monitor.export_metrics().await;
    assert_eq!(report.history.len(), 3);
    assert_eq!(report.history[0].misses, 3);
    assert_eq!(report.current.map(|s| s.misses), Some(5));
}

#[tokio::test]
async fn test_export_includes_backend_counters() {
    let cache = memory_manager();
    let monitor = monitor(Arc::clone(&cache), 10.0);
    cache.get("missing").await.unwrap();
    cache.set("k", json!(1), None).await.unwrap();
    cache.get("k").await.unwrap();

    let report = monitor.export_metrics().await;

    let memory = report.backends["memory"];
    assert_eq!(memory.operations, 3);
    assert_eq!(memory.hits, 1);
    assert_eq!(memory.misses, 1);
    assert_eq!(memory.errors, 0);
}

#[tokio::test]
async fn test_alerts_outside_retention_are_pruned() {
    let monitor = CacheMonitor::new(
        memory_manager(),
        Arc::new(FixedSystemMetrics(99.0)),
        MonitorConfig {
            alert_retention: Duration::from_millis(20),
            ..MonitorConfig::default()
        },
    )
    .unwrap();

    let snapshot = monitor.collect_metrics().await;
    assert_eq!(monitor.check_alerts(&snapshot).await.len(), 1);
    assert_eq!(monitor.alerts().await.len(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(monitor.alerts().await.is_empty());
    assert!(monitor.export_metrics().await.alerts.is_empty());
}

#[tokio::test]
async fn test_run_cycle_sweeps_expired_strategy_entries() {
    let cache = memory_manager();
    let strategy = Arc::new(StrategyManager::new(Arc::clone(&cache)));
    strategy
        .set_with_strategy("short", json!(1), Some(Duration::from_millis(20)), ["t"])
        .await
        .unwrap();
    let monitor = monitor(cache, 10.0).with_strategy(Arc::clone(&strategy));

    tokio::time::sleep(Duration::from_millis(50)).await;
    monitor.run_cycle().await;

    assert_eq!(strategy.tracked_len().await, 0);
    assert_eq!(monitor.export_metrics().await.history.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_runs_periodically_until_stopped() {
    let monitor = Arc::new(
        CacheMonitor::new(
            memory_manager(),
            Arc::new(FixedSystemMetrics(10.0)),
            MonitorConfig {
                interval: Duration::from_secs(10),
                ..MonitorConfig::default()
            },
        )
        .unwrap(),
    );

    monitor.start().await.unwrap();
    assert!(monitor.is_running().await);
    assert!(monitor.start().await.is_err());

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(monitor.export_metrics().await.history.len(), 2);

    assert!(monitor.stop(Duration::from_secs(1)).await);
    assert!(!monitor.is_running().await);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(monitor.export_metrics().await.history.len(), 2);
}

#[test]
fn test_zero_interval_is_rejected() {
    let err = CacheMonitor::new(
        memory_manager(),
        Arc::new(FixedSystemMetrics(10.0)),
        MonitorConfig {
            interval: Duration::ZERO,
            ..MonitorConfig::default()
        },
    )
    .unwrap_err();
    assert!(err.is_configuration());
}
