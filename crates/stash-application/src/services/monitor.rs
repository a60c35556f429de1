//! Cache Monitor
//!
//! Periodically turns the manager's counters into a [`MetricsSnapshot`],
//! keeps a bounded history, evaluates [`ThresholdRule`]s and raises an
//! [`Alert`] per breach. Registered callbacks run synchronously for each
//! alert; a failing callback is logged and the others still run. Alerts
//! older than the retention window are pruned. When a
//! [`StrategyManager`] is attached, every cycle also sweeps expired
//! entries.
//!
//! ## Default rules
//!
//! | Metric | Condition | Level |
//! |--------|-----------|-------|
//! | hit rate | `< hit_rate_min` | Warning |
//! | error rate | `> error_rate_max` | Error |
//! | response time | `> response_time_max_ms` | Warning |
//! | memory usage | `> memory_usage_max` | Critical |
//! | operations | `< operations_min` (when set) | Info |

use crate::services::manager::CacheManager;
use crate::services::strategy::StrategyManager;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use stash_domain::constants::{
    ALERT_RETENTION_SECS, DEFAULT_ERROR_RATE_MAX, DEFAULT_HIT_RATE_MIN, DEFAULT_MEMORY_USAGE_MAX,
    DEFAULT_RESPONSE_TIME_MAX_MS, METRICS_HISTORY_LIMIT, MONITOR_INTERVAL_SECS,
};
use stash_domain::error::{Error, Result};
use stash_domain::ports::infrastructure::SystemMetricsCollector;
use stash_domain::value_objects::{
    Alert, AlertLevel, Comparison, Metric, MetricsReport, MetricsSnapshot, ThresholdRule,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Callback invoked for every raised alert
pub type AlertCallback = Arc<dyn Fn(&Alert) -> Result<()> + Send + Sync>;

/// Limits turned into the default rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub hit_rate_min: f64,
    pub error_rate_max: f64,
    pub response_time_max_ms: f64,
    pub memory_usage_max: f64,
    pub operations_min: Option<u64>,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            hit_rate_min: DEFAULT_HIT_RATE_MIN,
            error_rate_max: DEFAULT_ERROR_RATE_MAX,
            response_time_max_ms: DEFAULT_RESPONSE_TIME_MAX_MS,
            memory_usage_max: DEFAULT_MEMORY_USAGE_MAX,
            operations_min: None,
        }
    }
}

impl AlertThresholds {
    /// Rules equivalent to these limits
    pub fn rules(&self) -> Vec<ThresholdRule> {
        let mut rules = vec![
            ThresholdRule::new(
                Metric::HitRate,
                Comparison::LessThan,
                self.hit_rate_min,
                AlertLevel::Warning,
            ),
            ThresholdRule::new(
                Metric::ErrorRate,
                Comparison::GreaterThan,
                self.error_rate_max,
                AlertLevel::Error,
            ),
            ThresholdRule::new(
                Metric::ResponseTime,
                Comparison::GreaterThan,
                self.response_time_max_ms,
                AlertLevel::Warning,
            ),
            ThresholdRule::new(
                Metric::MemoryUsage,
                Comparison::GreaterThan,
                self.memory_usage_max,
                AlertLevel::Critical,
            ),
        ];
        if let Some(min) = self.operations_min {
            rules.push(ThresholdRule::new(
                Metric::Operations,
                Comparison::LessThan,
                min as f64,
                AlertLevel::Info,
            ));
        }
        rules
    }
}

/// Monitor timing and retention
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub history_limit: usize,
    pub alert_retention: Duration,
    pub thresholds: AlertThresholds,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(MONITOR_INTERVAL_SECS),
            history_limit: METRICS_HISTORY_LIMIT,
            alert_retention: Duration::from_secs(ALERT_RETENTION_SECS),
            thresholds: AlertThresholds::default(),
        }
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    history: VecDeque<MetricsSnapshot>,
    alerts: Vec<Alert>,
}

struct MonitorWorker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Metrics collection and alerting over a [`CacheManager`]
pub struct CacheMonitor {
    cache: Arc<CacheManager>,
    system: Arc<dyn SystemMetricsCollector>,
    strategy: Option<Arc<StrategyManager>>,
    config: MonitorConfig,
    rules: RwLock<Vec<ThresholdRule>>,
    callbacks: RwLock<Vec<AlertCallback>>,
    state: Mutex<MonitorState>,
    worker: Mutex<Option<MonitorWorker>>,
}

impl CacheMonitor {
    /// Monitor with the default rules derived from `config.thresholds`
    pub fn new(
        cache: Arc<CacheManager>,
        system: Arc<dyn SystemMetricsCollector>,
        config: MonitorConfig,
    ) -> Result<Self> {
        if config.interval.is_zero() {
            return Err(Error::configuration(
                "Monitor interval must be greater than zero",
            ));
        }
        let rules = config.thresholds.rules();
        Ok(Self {
            cache,
            system,
            strategy: None,
            config,
            rules: RwLock::new(rules),
            callbacks: RwLock::new(Vec::new()),
            state: Mutex::new(MonitorState::default()),
            worker: Mutex::new(None),
        })
    }

    /// Also sweep expired strategy entries every cycle
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<StrategyManager>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Add a custom threshold rule
    pub async fn add_rule(&self, rule: ThresholdRule) {
        self.rules.write().await.push(rule);
    }

    /// Current rules
    pub async fn rules(&self) -> Vec<ThresholdRule> {
        self.rules.read().await.clone()
    }

    /// Register a callback run for every alert
    pub async fn on_alert<F>(&self, callback: F)
    where
        F: Fn(&Alert) -> Result<()> + Send + Sync + 'static,
    {
        self.callbacks.write().await.push(Arc::new(callback));
    }

    /// Take a snapshot and append it to the history
    pub async fn collect_metrics(&self) -> MetricsSnapshot {
        let counters = self.cache.metrics();
        let memory_usage = match self.system.collect().await {
            Ok(system) => system.memory_percent,
            Err(e) => {
                tracing::warn!(error = %e, "system metrics unavailable, reporting 0% memory");
                0.0
            }
        };
        let snapshot = MetricsSnapshot::new(
            counters.hits,
            counters.misses,
            counters.errors,
            counters.operations,
            counters.mean_response_ms,
            memory_usage,
        );

        let mut state = self.state.lock().await;
        state.history.push_back(snapshot.clone());
        while state.history.len() > self.config.history_limit {
            state.history.pop_front();
        }
        snapshot
    }

    /// Evaluate every rule against `snapshot`, record and dispatch alerts
    pub async fn check_alerts(&self, snapshot: &MetricsSnapshot) -> Vec<Alert> {
        let raised: Vec<Alert> = self
            .rules
            .read()
            .await
            .iter()
            .filter(|rule| rule.breached(snapshot))
            .map(|rule| Alert::new(rule.level, rule.describe(snapshot), snapshot.clone()))
            .collect();

        {
            let mut state = self.state.lock().await;
            state.alerts.extend(raised.iter().cloned());
            self.prune_alerts(&mut state);
        }

        if !raised.is_empty() {
            let callbacks = self.callbacks.read().await;
            for alert in &raised {
                tracing::warn!(level = %alert.level, message = %alert.message, "cache alert");
                for callback in callbacks.iter() {
                    if let Err(e) = callback(alert) {
                        tracing::error!(error = %e, alert = %alert.message, "alert callback failed");
                    }
                }
            }
        }
        raised
    }

    fn prune_alerts(&self, state: &mut MonitorState) {
        let Ok(retention) = chrono::Duration::from_std(self.config.alert_retention) else {
            return;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return;
        };
        state.alerts.retain(|alert| alert.timestamp >= cutoff);
    }

    /// One full monitoring cycle
    pub async fn run_cycle(&self) -> MetricsSnapshot {
        let snapshot = self.collect_metrics().await;
        self.check_alerts(&snapshot).await;
        if let Some(strategy) = &self.strategy {
            if let Err(e) = strategy.invalidate_expired().await {
                tracing::warn!(error = %e, "expiry sweep failed");
            }
        }
        tracing::debug!(
            hit_rate = snapshot.hit_rate,
            error_rate = snapshot.error_rate,
            operations = snapshot.operations,
            "collected cache metrics"
        );
        snapshot
    }

    /// Spawn the periodic loop
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return Err(Error::internal("Cache monitor is already running"));
        }

        let token = CancellationToken::new();
        let monitor = Arc::clone(self);
        let loop_token = token.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = loop_token.cancelled() => break,
                    () = tokio::time::sleep(monitor.config.interval) => {}
                }
                monitor.run_cycle().await;
            }
            tracing::debug!("cache monitor stopped");
        });

        tracing::info!(interval_secs = self.config.interval.as_secs(), "cache monitor started");
        *worker = Some(MonitorWorker { token, handle });
        Ok(())
    }

    /// Whether the periodic loop is running
    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some()
    }

    /// Stop the loop, waiting up to `timeout`; true when it stopped in time
    pub async fn stop(&self, timeout: Duration) -> bool {
        let Some(worker) = self.worker.lock().await.take() else {
            return true;
        };
        worker.token.cancel();
        match tokio::time::timeout(timeout, worker.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "cache monitor task panicked");
                false
            }
            Err(_) => {
                tracing::warn!("cache monitor did not stop in time, abandoning");
                false
            }
        }
    }

    /// Alerts inside the retention window
    pub async fn alerts(&self) -> Vec<Alert> {
        let mut state = self.state.lock().await;
        self.prune_alerts(&mut state);
        state.alerts.clone()
    }

    /// Current snapshot, history and alerts
    pub async fn export_metrics(&self) -> MetricsReport {
        let mut state = self.state.lock().await;
        self.prune_alerts(&mut state);
        MetricsReport {
            current: state.history.back().cloned(),
            history: state.history.iter().cloned().collect(),
            alerts: state.alerts.iter().map(Alert::summary).collect(),
            backends: self.cache.backend_stats(),
        }
    }
}

impl std::fmt::Debug for CacheMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMonitor")
            .field("config", &self.config)
            .field("strategy_attached", &self.strategy.is_some())
            .finish_non_exhaustive()
    }
}
