//! Unit tests for the exported metrics report

use stash_domain::{Alert, AlertLevel, BackendStats, MetricsReport, MetricsSnapshot};
use std::collections::BTreeMap;

#[test]
fn test_report_json_shape() {
    let snapshot = MetricsSnapshot::new(8, 2, 1, 11, 3.5, 20.0);
    let alert = Alert::new(AlertLevel::Warning, "hit rate low", snapshot.clone());
    let report = MetricsReport {
        current: Some(snapshot.clone()),
        history: vec![snapshot],
        alerts: vec![alert.summary()],
        backends: BTreeMap::from([(
            "remote".to_string(),
            BackendStats {
                operations: 4,
                errors: 1,
                hits: 2,
                misses: 1,
            },
        )]),
    };

    let json = serde_json::to_value(&report).unwrap();
    let current = &json["current"];
    for field in [
        "hits",
        "misses",
        "errors",
        "operations",
        "hit_rate",
        "error_rate",
        "response_time",
        "memory_usage",
        "timestamp",
    ] {
        assert!(current.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(json["history"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["alerts"][0]["level"], "WARNING");
    assert_eq!(json["alerts"][0]["message"], "hit rate low");
    assert!(json["alerts"][0].get("metrics").is_none());
    assert_eq!(json["backends"]["remote"]["errors"], 1);
}

#[test]
fn test_empty_report_has_no_current() {
    let json = serde_json::to_value(MetricsReport::default()).unwrap();
    assert!(json["current"].is_null());
}
