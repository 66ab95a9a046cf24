//! Shapes raw Insights rows and metric datapoints into the JSON the tools return.
//!
//! Everything here is pure. Missing fields are left out rather than defaulted,
//! and rows are kept in the order the service returned them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::backend::MetricDatapoint;
use crate::error::{CwLensError, Result};
use crate::query::RowRecord;
use crate::time_range::format_epoch_millis;

pub const HOUR_BIN_FIELD: &str = "bin(1h)";

/// Event of the cross-group timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedEvent {
    pub log_group: String,
    pub timestamp: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub log_stream: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivityCounts {
    pub log_events: i64,
    pub unique_streams: i64,
}

/// Hourly metric sums in timestamp order, plus their total.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricSeries {
    pub points: Vec<Value>,
    pub total: f64,
}

fn parse_int(field: &str, value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| CwLensError::Projection {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Search rows as field maps.
pub fn search_results(rows: &[RowRecord]) -> Vec<Value> {
    rows.iter().map(|row| Value::Object(row.to_map())).collect()
}

/// `logEvents` / `streams` of the summary query. Absent values count as zero.
pub fn activity_counts(rows: &[RowRecord]) -> Result<ActivityCounts> {
    let mut counts = ActivityCounts::default();
    for row in rows {
        if let Some(value) = row.get("logEvents") {
            counts.log_events = parse_int("logEvents", value)?;
        }
        if let Some(value) = row.get("streams") {
            counts.unique_streams = parse_int("streams", value)?;
        }
    }
    Ok(counts)
}

/// `{hour, count}` per row; rows carrying neither are skipped.
pub fn hourly_distribution(rows: &[RowRecord]) -> Result<Vec<Value>> {
    let mut distribution = Vec::new();
    for row in rows {
        let mut entry = serde_json::Map::new();
        if let Some(hour) = row.get(HOUR_BIN_FIELD) {
            entry.insert("hour".to_string(), json!(hour));
        }
        if let Some(count) = row.get("count") {
            entry.insert("count".to_string(), json!(parse_int("count", count)?));
        }
        if !entry.is_empty() {
            distribution.push(Value::Object(entry));
        }
    }
    Ok(distribution)
}

/// `{message, count}` per row; rows carrying neither are skipped.
pub fn error_patterns(rows: &[RowRecord]) -> Result<Vec<Value>> {
    let mut patterns = Vec::new();
    for row in rows {
        let mut entry = serde_json::Map::new();
        if let Some(message) = row.get("@message") {
            entry.insert("message".to_string(), json!(message));
        }
        if let Some(count) = row.get("errorCount") {
            entry.insert("count".to_string(), json!(parse_int("errorCount", count)?));
        }
        if !entry.is_empty() {
            patterns.push(Value::Object(entry));
        }
    }
    Ok(patterns)
}

/// Rows lacking a non-empty timestamp or message are dropped.
pub fn correlated_events(log_group: &str, rows: &[RowRecord]) -> Vec<CorrelatedEvent> {
    rows.iter()
        .filter_map(|row| {
            let timestamp = row.get("@timestamp").filter(|v| !v.is_empty())?;
            let message = row.get("@message").filter(|v| !v.is_empty())?;
            Some(CorrelatedEvent {
                log_group: log_group.to_string(),
                timestamp: timestamp.to_string(),
                message: message.to_string(),
                log_stream: row.get("@logStream").map(str::to_string),
            })
        })
        .collect()
}

/// Stable sort by the raw timestamp string.
pub fn merge_timeline(events: impl IntoIterator<Item = CorrelatedEvent>) -> Vec<CorrelatedEvent> {
    let mut merged: Vec<_> = events.into_iter().collect();
    merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    merged
}

/// Sort datapoints by time and label each sum with `value_key`.
pub fn metric_series(datapoints: &[MetricDatapoint], value_key: &str) -> MetricSeries {
    let mut sorted = datapoints.to_vec();
    sorted.sort_by_key(|point| point.timestamp_ms);

    let mut series = MetricSeries::default();
    for point in sorted {
        series.total += point.sum;
        let mut entry = serde_json::Map::new();
        entry.insert("timestamp".to_string(), json!(format_epoch_millis(point.timestamp_ms)));
        entry.insert(value_key.to_string(), json!(point.sum));
        series.points.push(Value::Object(entry));
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::row;

    fn record(cells: &[(&str, &str)]) -> RowRecord {
        RowRecord::new(row(cells))
    }

    #[test]
    fn test_error_pattern_count_is_integer() {
        let rows = vec![record(&[("@message", "x"), ("errorCount", "5")])];
        let patterns = error_patterns(&rows).unwrap();
        assert_eq!(patterns, vec![json!({"message": "x", "count": 5})]);
    }

    #[test]
    fn test_error_pattern_partial_and_empty_rows() {
        let rows = vec![
            record(&[("errorCount", "2")]),
            record(&[("unrelated", "1")]),
            record(&[("@message", "only message")]),
        ];
        let patterns = error_patterns(&rows).unwrap();
        assert_eq!(
            patterns,
            vec![json!({"count": 2}), json!({"message": "only message"})]
        );
    }

    #[test]
    fn test_non_integer_count_is_projection_error() {
        let rows = vec![record(&[("@message", "x"), ("errorCount", "five")])];
        let err = error_patterns(&rows).unwrap_err();
        assert_eq!(err.kind(), "ProjectionError");
        assert!(err.to_string().contains("errorCount"));
    }

    #[test]
    fn test_activity_counts() {
        let rows = vec![record(&[("logEvents", "1200"), ("streams", "4")])];
        let counts = activity_counts(&rows).unwrap();
        assert_eq!(counts.log_events, 1200);
        assert_eq!(counts.unique_streams, 4);

        assert_eq!(activity_counts(&[]).unwrap(), ActivityCounts::default());
    }

    #[test]
    fn test_hourly_distribution_keeps_row_order() {
        let rows = vec![
            record(&[("bin(1h)", "2024-03-01 11:00:00.000"), ("count", "7")]),
            record(&[]),
            record(&[("bin(1h)", "2024-03-01 10:00:00.000"), ("count", "3")]),
        ];
        let hours = hourly_distribution(&rows).unwrap();
        assert_eq!(
            hours,
            vec![
                json!({"hour": "2024-03-01 11:00:00.000", "count": 7}),
                json!({"hour": "2024-03-01 10:00:00.000", "count": 3}),
            ]
        );
    }

    #[test]
    fn test_correlated_events_drop_incomplete_rows() {
        let rows = vec![
            record(&[("@timestamp", "2024-03-01 10:00:00.000"), ("@message", "a"), ("@logStream", "s1")]),
            record(&[("@timestamp", "2024-03-01 10:00:01.000")]),
            record(&[("@message", "no timestamp")]),
            record(&[("@timestamp", ""), ("@message", "empty timestamp")]),
        ];
        let events = correlated_events("/app", &rows);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].log_stream.as_deref(), Some("s1"));
        assert_eq!(
            serde_json::to_value(&events[0]).unwrap(),
            json!({
                "logGroup": "/app",
                "timestamp": "2024-03-01 10:00:00.000",
                "message": "a",
                "logStream": "s1"
            })
        );
    }

    #[test]
    fn test_merge_timeline_is_stable() {
        let event = |group: &str, ts: &str| CorrelatedEvent {
            log_group: group.to_string(),
            timestamp: ts.to_string(),
            message: "m".to_string(),
            log_stream: None,
        };
        let merged = merge_timeline(vec![
            event("a", "2024-03-01 10:00:02.000"),
            event("a", "2024-03-01 10:00:00.000"),
            event("b", "2024-03-01 10:00:02.000"),
        ]);
        let order: Vec<_> = merged.iter().map(|e| (e.log_group.as_str(), e.timestamp.as_str())).collect();
        assert_eq!(
            order,
            vec![
                ("a", "2024-03-01 10:00:00.000"),
                ("a", "2024-03-01 10:00:02.000"),
                ("b", "2024-03-01 10:00:02.000"),
            ]
        );
    }

    #[test]
    fn test_metric_series_sorted_and_totaled() {
        let points = vec![
            MetricDatapoint { timestamp_ms: 1_709_254_800_000, sum: 2048.0 },
            MetricDatapoint { timestamp_ms: 1_709_251_200_000, sum: 512.5 },
        ];
        let series = metric_series(&points, "bytes");
        assert_eq!(series.total, 2560.5);
        assert_eq!(
            series.points,
            vec![
                json!({"timestamp": "2024-03-01T00:00:00.000Z", "bytes": 512.5}),
                json!({"timestamp": "2024-03-01T01:00:00.000Z", "bytes": 2048.0}),
            ]
        );
    }

    #[test]
    fn test_metric_series_empty() {
        let series = metric_series(&[], "events");
        assert!(series.points.is_empty());
        assert_eq!(series.total, 0.0);
    }

    #[test]
    fn test_search_results_keep_field_order() {
        let rows = vec![record(&[("@timestamp", "t"), ("@message", "m"), ("@logStream", "s")])];
        let results = search_results(&rows);
        let keys: Vec<_> = results[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["@timestamp", "@message", "@logStream"]);
    }
}
