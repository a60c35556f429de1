//! Metrics snapshots, alerts and threshold rules
//!
//! A [`MetricsSnapshot`] is a point-in-time view of the cache counters.
//! Thresholds are expressed as [`ThresholdRule`] values (metric, comparison,
//! threshold, level) and evaluated against snapshots; nothing is ever parsed
//! out of a string.

use crate::ports::providers::cache::BackendStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ratio helper returning 0 when the denominator is 0
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Point-in-time cache metrics
///
/// Counters are cumulative since the manager was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Successful lookups
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Failed operations
    pub errors: u64,
    /// All operations
    pub operations: u64,
    /// `hits / (hits + misses)`, 0 without lookups
    pub hit_rate: f64,
    /// `errors / operations`, 0 without operations
    pub error_rate: f64,
    /// Mean response time in milliseconds
    pub response_time: f64,
    /// Process memory usage as a percentage of system memory
    pub memory_usage: f64,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Build a snapshot, deriving the rates from the counters
    pub fn new(
        hits: u64,
        misses: u64,
        errors: u64,
        operations: u64,
        response_time: f64,
        memory_usage: f64,
    ) -> Self {
        Self {
            hits,
            misses,
            errors,
            operations,
            hit_rate: ratio(hits, hits.saturating_add(misses)),
            error_rate: ratio(errors, operations),
            response_time,
            memory_usage,
            timestamp: Utc::now(),
        }
    }

    /// Total lookups (hits plus misses)
    pub fn lookups(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// A threshold breach observed by the monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Severity
    pub level: AlertLevel,
    /// Human-readable description
    pub message: String,
    /// When the breach was detected
    pub timestamp: DateTime<Utc>,
    /// Metrics at trigger time
    pub metrics: MetricsSnapshot,
}

impl Alert {
    /// Raise an alert stamped with the current time
    pub fn new(level: AlertLevel, message: impl Into<String>, metrics: MetricsSnapshot) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            metrics,
        }
    }

    /// Export form without the embedded snapshot
    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            level: self.level,
            message: self.message.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Alert as it appears in a [`MetricsReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Quantity a threshold rule looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HitRate,
    ErrorRate,
    ResponseTime,
    MemoryUsage,
    Operations,
}

impl Metric {
    /// Read this metric out of a snapshot
    pub fn value_of(&self, snapshot: &MetricsSnapshot) -> f64 {
        match self {
            Self::HitRate => snapshot.hit_rate,
            Self::ErrorRate => snapshot.error_rate,
            Self::ResponseTime => snapshot.response_time,
            Self::MemoryUsage => snapshot.memory_usage,
            Self::Operations => snapshot.operations as f64,
        }
    }

    /// Whether the snapshot carries enough data for the metric to mean anything
    ///
    /// Rates are undefined before the first lookup/operation, so rules on
    /// them stay quiet on an idle cache.
    pub fn is_applicable(&self, snapshot: &MetricsSnapshot) -> bool {
        match self {
            Self::HitRate => snapshot.lookups() > 0,
            Self::ErrorRate | Self::ResponseTime => snapshot.operations > 0,
            Self::MemoryUsage | Self::Operations => true,
        }
    }

    /// Name used in alert messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::HitRate => "hit rate",
            Self::ErrorRate => "error rate",
            Self::ResponseTime => "response time (ms)",
            Self::MemoryUsage => "memory usage (%)",
            Self::Operations => "operations",
        }
    }
}

/// Comparison operator of a threshold rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
}

impl Comparison {
    /// Evaluate `value <op> threshold`
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::LessThan => value < threshold,
            Self::LessOrEqual => value <= threshold,
            Self::GreaterThan => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
        }
    }

    /// Operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
        }
    }
}

/// Alert condition: raise `level` when `metric <comparison> threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub metric: Metric,
    pub comparison: Comparison,
    pub threshold: f64,
    pub level: AlertLevel,
}

impl ThresholdRule {
    pub fn new(metric: Metric, comparison: Comparison, threshold: f64, level: AlertLevel) -> Self {
        Self {
            metric,
            comparison,
            threshold,
            level,
        }
    }

    /// Whether the snapshot breaches this rule
    pub fn breached(&self, snapshot: &MetricsSnapshot) -> bool {
        self.metric.is_applicable(snapshot)
            && self
                .comparison
                .holds(self.metric.value_of(snapshot), self.threshold)
    }

    /// Alert message for a breach against `snapshot`
    pub fn describe(&self, snapshot: &MetricsSnapshot) -> String {
        format!(
            "{} is {:.3} ({} {})",
            self.metric.label(),
            self.metric.value_of(snapshot),
            self.comparison.symbol(),
            self.threshold
        )
    }
}

/// Output of the monitor's metrics export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Most recent snapshot, `None` before the first collection
    pub current: Option<MetricsSnapshot>,
    /// Retained snapshots, oldest first
    pub history: Vec<MetricsSnapshot>,
    /// Alerts inside the retention window
    pub alerts: Vec<AlertSummary>,
    /// Counters kept by each backend, keyed by backend name
    #[serde(default)]
    pub backends: BTreeMap<String, BackendStats>,
}
