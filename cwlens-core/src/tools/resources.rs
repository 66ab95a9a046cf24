//! Browsing operations behind the `logs://` resources.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::envelope::respond;
use crate::backend::{IngestionMetric, LogGroupSummary, LogsBackend};
use crate::config::QuerySettings;
use crate::error::{CwLensError, Result};
use crate::projector;
use crate::session::SessionProvider;
use crate::structure;
use crate::time_range::{format_epoch_millis, TimeRangeArgs};

pub const DEFAULT_GROUP_LIMIT: i32 = 50;
pub const DEFAULT_STREAM_LIMIT: i32 = 20;
pub const DEFAULT_EVENT_LIMIT: i32 = 100;
pub const DEFAULT_SAMPLE_LIMIT: i32 = 10;
pub const STRUCTURE_SAMPLE_LIMIT: i32 = 50;
pub const RECENT_ERROR_HOURS: i64 = 24;
pub const METRIC_HOURS: i64 = 24;

const ERROR_TERMS: &[&str] = &[
    "ERROR", "Error", "error", "exception", "Exception", "EXCEPTION", "fail", "Fail", "FAIL",
];

/// Filter pattern matching any of the common error terms.
pub fn recent_errors_pattern() -> String {
    ERROR_TERMS
        .iter()
        .map(|term| format!("\"{}\"", term))
        .collect::<Vec<_>>()
        .join(" ")
}

fn optional_time(ms: Option<i64>) -> Value {
    match ms {
        Some(ms) if ms != 0 => json!(format_epoch_millis(ms)),
        _ => Value::Null,
    }
}

fn group_listing(group: &LogGroupSummary) -> Value {
    json!({
        "name": group.name,
        "arn": group.arn,
        "storedBytes": group.stored_bytes,
        "creationTime": format_epoch_millis(group.creation_time.unwrap_or(0)),
    })
}

#[derive(Clone)]
pub struct LogsResource {
    session: Arc<dyn SessionProvider>,
    settings: QuerySettings,
}

impl LogsResource {
    pub fn new(session: Arc<dyn SessionProvider>, settings: QuerySettings) -> Self {
        Self { session, settings }
    }

    pub async fn list_log_groups(
        &self,
        prefix: Option<&str>,
        limit: Option<i32>,
        next_token: Option<&str>,
    ) -> Value {
        respond("list_log_groups", self.run_list_groups(prefix, limit, next_token)).await
    }

    pub async fn log_group_details(&self, log_group_name: &str) -> Value {
        respond("log_group_details", self.run_group_details(log_group_name)).await
    }

    pub async fn log_streams(&self, log_group_name: &str) -> Value {
        respond("log_streams", self.run_streams(log_group_name)).await
    }

    pub async fn log_events(&self, log_group_name: &str, log_stream_name: &str) -> Value {
        respond("log_events", self.run_events(log_group_name, log_stream_name)).await
    }

    pub async fn log_sample(&self, log_group_name: &str) -> Value {
        respond("log_sample", self.run_sample(log_group_name, DEFAULT_SAMPLE_LIMIT)).await
    }

    pub async fn recent_errors(&self, log_group_name: &str) -> Value {
        respond("recent_errors", self.run_recent_errors(log_group_name, RECENT_ERROR_HOURS)).await
    }

    pub async fn log_metrics(&self, log_group_name: &str) -> Value {
        respond("log_metrics", self.run_metrics(log_group_name, METRIC_HOURS)).await
    }

    pub async fn log_structure(&self, log_group_name: &str) -> Value {
        respond("log_structure", self.run_structure(log_group_name)).await
    }

    async fn run_list_groups(
        &self,
        prefix: Option<&str>,
        limit: Option<i32>,
        next_token: Option<&str>,
    ) -> Result<Value> {
        let backend = self.session.logs_backend().await?;
        let page = backend
            .describe_log_groups(
                prefix.filter(|p| !p.is_empty()),
                limit.unwrap_or(DEFAULT_GROUP_LIMIT),
                next_token.filter(|t| !t.is_empty()),
            )
            .await?;

        let mut response = serde_json::Map::new();
        response.insert(
            "logGroups".to_string(),
            Value::Array(page.groups.iter().map(group_listing).collect()),
        );
        if let Some(token) = page.next_token {
            response.insert("nextToken".to_string(), json!(token));
        }
        Ok(Value::Object(response))
    }

    async fn run_group_details(&self, log_group_name: &str) -> Result<Value> {
        let backend = self.session.logs_backend().await?;
        let page = backend
            .describe_log_groups(Some(log_group_name), DEFAULT_GROUP_LIMIT, None)
            .await?;

        // The prefix lookup can return longer names sharing the prefix
        let group = page
            .groups
            .into_iter()
            .find(|g| g.name.as_deref() == Some(log_group_name))
            .ok_or_else(|| CwLensError::LogGroupNotFound(log_group_name.to_string()))?;

        let daily_window = TimeRangeArgs::hours(METRIC_HOURS).resolve()?;
        let daily_bytes = backend
            .hourly_metric_sums(log_group_name, IngestionMetric::IncomingBytes, daily_window)
            .await?;

        let retention = match group.retention_in_days {
            Some(days) => format!("{} days", days),
            None => "Never Expire".to_string(),
        };

        Ok(json!({
            "name": group.name,
            "arn": group.arn,
            "storedBytes": group.stored_bytes,
            "creationTime": format_epoch_millis(group.creation_time.unwrap_or(0)),
            "retentionPolicy": retention,
            "metricFilterCount": group.metric_filter_count.unwrap_or(0),
            "kmsKeyId": group.kms_key_id.unwrap_or_else(|| "Not encrypted with KMS".to_string()),
            "dailyIncomingBytes": projector::metric_series(&daily_bytes, "bytes").points,
        }))
    }

    async fn run_streams(&self, log_group_name: &str) -> Result<Value> {
        let backend = self.session.logs_backend().await?;
        let streams = backend
            .describe_log_streams(log_group_name, DEFAULT_STREAM_LIMIT)
            .await?;

        Ok(Value::Array(
            streams
                .into_iter()
                .map(|stream| {
                    json!({
                        "name": stream.name,
                        "firstEventTime": optional_time(stream.first_event_timestamp),
                        "lastEventTime": optional_time(stream.last_event_timestamp),
                        "storedBytes": stream.stored_bytes,
                    })
                })
                .collect(),
        ))
    }

    async fn run_events(&self, log_group_name: &str, log_stream_name: &str) -> Result<Value> {
        let backend = self.session.logs_backend().await?;
        let events = backend
            .get_log_events(log_group_name, log_stream_name, DEFAULT_EVENT_LIMIT)
            .await?;

        Ok(Value::Array(
            events
                .into_iter()
                .map(|event| {
                    json!({
                        "timestamp": format_epoch_millis(event.timestamp),
                        "message": event.message,
                        "ingestionTime": format_epoch_millis(event.ingestion_time),
                    })
                })
                .collect(),
        ))
    }

    /// Newest stream and its most recent events.
    async fn newest_stream_events(
        &self,
        backend: &Arc<dyn LogsBackend>,
        log_group_name: &str,
        limit: i32,
    ) -> Result<(String, Vec<crate::backend::StreamEvent>)> {
        let streams = backend.describe_log_streams(log_group_name, 1).await?;
        let stream_name = streams
            .into_iter()
            .next()
            .and_then(|s| s.name)
            .ok_or_else(|| {
                CwLensError::NoData(format!("No streams found in log group '{}'", log_group_name))
            })?;

        debug!("Sampling {} from stream {}", log_group_name, stream_name);
        let events = backend
            .get_log_events(log_group_name, &stream_name, limit)
            .await?;
        Ok((stream_name, events))
    }

    async fn run_sample(&self, log_group_name: &str, limit: i32) -> Result<Value> {
        let backend = self.session.logs_backend().await?;
        let (stream_name, events) = self
            .newest_stream_events(&backend, log_group_name, limit)
            .await?;

        let formatted: Vec<Value> = events
            .into_iter()
            .map(|event| {
                json!({
                    "timestamp": format_epoch_millis(event.timestamp),
                    "message": event.message,
                    "streamName": stream_name,
                })
            })
            .collect();

        Ok(json!({
            "description": format!(
                "Sample of {} recent logs from '{}'",
                formatted.len(),
                log_group_name
            ),
            "logStream": stream_name,
            "events": formatted,
        }))
    }

    async fn run_recent_errors(&self, log_group_name: &str, hours: i64) -> Result<Value> {
        let window = TimeRangeArgs::hours(hours).resolve()?;
        let backend = self.session.logs_backend().await?;
        let events = backend
            .filter_log_events(
                log_group_name,
                &recent_errors_pattern(),
                window,
                self.settings.default_limit,
            )
            .await?;

        let formatted: Vec<Value> = events
            .into_iter()
            .map(|event| {
                json!({
                    "timestamp": format_epoch_millis(event.timestamp),
                    "message": event.message,
                    "logStreamName": event.log_stream_name,
                })
            })
            .collect();

        Ok(json!({
            "description": format!(
                "Recent errors from '{}' in the last {} hours",
                log_group_name, hours
            ),
            "totalErrors": formatted.len(),
            "events": formatted,
        }))
    }

    async fn run_metrics(&self, log_group_name: &str, hours: i64) -> Result<Value> {
        let window = TimeRangeArgs::hours(hours).resolve()?;
        let backend = self.session.logs_backend().await?;
        let (bytes, events) = tokio::try_join!(
            backend.hourly_metric_sums(log_group_name, IngestionMetric::IncomingBytes, window),
            backend.hourly_metric_sums(log_group_name, IngestionMetric::IncomingLogEvents, window),
        )?;

        let bytes = projector::metric_series(&bytes, "bytes");
        let events = projector::metric_series(&events, "events");
        Ok(json!({
            "description": format!(
                "Log metrics for '{}' over the last {} hours",
                log_group_name, hours
            ),
            "totalBytes": bytes.total,
            "totalEvents": events.total,
            "bytesByHour": bytes.points,
            "eventsByHour": events.points,
        }))
    }

    async fn run_structure(&self, log_group_name: &str) -> Result<Value> {
        let backend = self.session.logs_backend().await?;
        let (_, events) = self
            .newest_stream_events(&backend, log_group_name, STRUCTURE_SAMPLE_LIMIT)
            .await?;

        let messages: Vec<String> = events
            .into_iter()
            .map(|event| event.message.unwrap_or_default())
            .collect();
        if messages.is_empty() {
            return Err(CwLensError::NoData(
                "No log events found for analysis".to_string(),
            ));
        }

        Ok(structure::analyze(log_group_name, &messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FilteredEvent, InMemoryBackend, LogStreamSummary, StreamEvent};
    use crate::session::StaticSessionProvider;

    fn resource(backend: Arc<InMemoryBackend>) -> LogsResource {
        LogsResource::new(
            Arc::new(StaticSessionProvider::new(backend)),
            QuerySettings::default(),
        )
    }

    fn group(name: &str) -> LogGroupSummary {
        LogGroupSummary {
            name: Some(name.to_string()),
            arn: Some(format!("arn:aws:logs:us-east-1:123456789012:log-group:{}", name)),
            stored_bytes: Some(1024),
            creation_time: Some(1_709_251_200_000),
            retention_in_days: None,
            metric_filter_count: None,
            kms_key_id: None,
        }
    }

    fn stream(name: &str, last: i64) -> LogStreamSummary {
        LogStreamSummary {
            name: Some(name.to_string()),
            first_event_timestamp: Some(1_709_251_200_000),
            last_event_timestamp: Some(last),
            stored_bytes: None,
        }
    }

    fn event(ts: i64, message: &str) -> StreamEvent {
        StreamEvent {
            timestamp: ts,
            message: Some(message.to_string()),
            ingestion_time: ts + 5,
        }
    }

    #[test]
    fn test_recent_errors_pattern_quotes_terms() {
        let pattern = recent_errors_pattern();
        assert!(pattern.starts_with("\"ERROR\" \"Error\" \"error\""));
        assert!(pattern.ends_with("\"FAIL\""));
    }

    #[tokio::test]
    async fn test_list_log_groups_with_pagination() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_group(group("/aws/lambda/a"));
        backend.add_group(group("/aws/lambda/b"));
        backend.add_group(group("/ecs/web"));

        let resource = resource(backend);
        let first = resource.list_log_groups(Some("/aws/lambda"), Some(1), None).await;
        assert_eq!(first["logGroups"][0]["name"], "/aws/lambda/a");
        assert_eq!(first["logGroups"][0]["creationTime"], "2024-03-01T00:00:00.000Z");
        let token = first["nextToken"].as_str().unwrap().to_string();

        let second = resource
            .list_log_groups(Some("/aws/lambda"), Some(1), Some(&token))
            .await;
        assert_eq!(second["logGroups"][0]["name"], "/aws/lambda/b");
        assert!(second.get("nextToken").is_none());
    }

    #[tokio::test]
    async fn test_group_details_requires_exact_name() {
        let backend = Arc::new(InMemoryBackend::new());
        let mut detailed = group("/app/api");
        detailed.retention_in_days = Some(14);
        detailed.kms_key_id = Some("key-1".to_string());
        backend.add_group(group("/app/api-canary"));
        backend.add_group(detailed);

        let resource = resource(backend);
        let details = resource.log_group_details("/app/api").await;
        assert_eq!(details["name"], "/app/api");
        assert_eq!(details["retentionPolicy"], "14 days");
        assert_eq!(details["kmsKeyId"], "key-1");
        assert_eq!(details["metricFilterCount"], 0);

        let canary = resource.log_group_details("/app/api-canary").await;
        assert_eq!(canary["retentionPolicy"], "Never Expire");
        assert_eq!(canary["kmsKeyId"], "Not encrypted with KMS");

        let missing = resource.log_group_details("/app").await;
        assert_eq!(missing["status"], "Error");
        assert_eq!(missing["error_type"], "LogGroupNotFound");
    }

    #[tokio::test]
    async fn test_streams_newest_first() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_stream("/app", stream("old", 1_709_251_300_000));
        backend.add_stream("/app", stream("new", 1_709_251_400_000));

        let streams = resource(backend).log_streams("/app").await;
        assert_eq!(streams[0]["name"], "new");
        assert_eq!(streams[1]["name"], "old");
        assert_eq!(streams[0]["storedBytes"], Value::Null);
    }

    #[tokio::test]
    async fn test_sample_reads_newest_stream() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_stream("/app", stream("old", 1_709_251_300_000));
        backend.add_stream("/app", stream("new", 1_709_251_400_000));
        backend.add_stream_event("/app", "new", event(1_709_251_400_000, "hello"));
        backend.add_stream_event("/app", "old", event(1_709_251_300_000, "stale"));

        let sample = resource(backend).log_sample("/app").await;
        assert_eq!(sample["logStream"], "new");
        assert_eq!(sample["events"][0]["message"], "hello");
        assert_eq!(sample["events"][0]["streamName"], "new");
        assert_eq!(sample["description"], "Sample of 1 recent logs from '/app'");
    }

    #[tokio::test]
    async fn test_sample_without_streams() {
        let backend = Arc::new(InMemoryBackend::new());
        let sample = resource(backend).log_sample("/empty").await;
        assert_eq!(sample["status"], "Error");
        assert_eq!(sample["error"], "No streams found in log group '/empty'");
    }

    #[tokio::test]
    async fn test_recent_errors() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_filtered_event(
            "/app",
            FilteredEvent {
                timestamp: 1_709_251_200_000,
                message: Some("ERROR nope".to_string()),
                log_stream_name: Some("s".to_string()),
            },
        );

        let errors = resource(backend.clone()).recent_errors("/app").await;
        assert_eq!(errors["totalErrors"], 1);
        assert_eq!(errors["events"][0]["logStreamName"], "s");
        assert_eq!(backend.filter_patterns(), vec![recent_errors_pattern()]);
    }

    #[tokio::test]
    async fn test_metrics_report_ingestion_sums() {
        let now = chrono::Utc::now().timestamp_millis();
        let hour = 3_600_000;
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .add_metric("/app", IngestionMetric::IncomingBytes, now - hour, 600.0)
            .add_metric("/app", IngestionMetric::IncomingBytes, now - 2 * hour, 400.0)
            .add_metric("/app", IngestionMetric::IncomingLogEvents, now - 2 * hour, 4.0)
            .add_metric("/app", IngestionMetric::IncomingLogEvents, now - hour, 6.0)
            .add_metric("/app", IngestionMetric::IncomingBytes, now - 30 * hour, 9999.0)
            .add_metric("/other", IngestionMetric::IncomingBytes, now - hour, 1.0);

        let metrics = resource(backend.clone()).log_metrics("/app").await;
        assert_eq!(metrics["description"], "Log metrics for '/app' over the last 24 hours");
        assert_eq!(metrics["totalBytes"].as_f64(), Some(1000.0));
        assert_eq!(metrics["totalEvents"].as_f64(), Some(10.0));
        assert_eq!(metrics["bytesByHour"][0]["bytes"].as_f64(), Some(400.0));
        assert_eq!(metrics["bytesByHour"][1]["bytes"].as_f64(), Some(600.0));
        assert_eq!(metrics["eventsByHour"][1]["events"].as_f64(), Some(6.0));
        assert_eq!(metrics["bytesByHour"].as_array().unwrap().len(), 2);

        // Ingestion metrics never go through Insights
        assert!(backend.submitted().is_empty());
        let windows = backend.metric_windows();
        assert_eq!(windows.len(), 2);
        for (_, window) in windows {
            assert_eq!(window.end_ms - window.start_ms, 24 * hour);
        }
    }

    #[tokio::test]
    async fn test_metrics_without_datapoints() {
        let backend = Arc::new(InMemoryBackend::new());
        let metrics = resource(backend).log_metrics("/quiet").await;
        assert_eq!(metrics["totalBytes"].as_f64(), Some(0.0));
        assert_eq!(metrics["bytesByHour"], json!([]));
        assert_eq!(metrics["eventsByHour"], json!([]));
    }

    #[tokio::test]
    async fn test_metrics_failure_is_envelope() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_group("/locked");
        let metrics = resource(backend).log_metrics("/locked").await;
        assert_eq!(metrics["status"], "Error");
        assert_eq!(metrics["error_type"], "BackendError");
    }

    #[tokio::test]
    async fn test_group_details_include_daily_incoming_bytes() {
        let now = chrono::Utc::now().timestamp_millis();
        let backend = Arc::new(InMemoryBackend::new());
        backend
            .add_group(group("/app/api"))
            .add_metric("/app/api", IngestionMetric::IncomingBytes, now - 3_600_000, 128.0)
            .add_metric("/app/api", IngestionMetric::IncomingLogEvents, now - 3_600_000, 3.0);

        let details = resource(backend.clone()).log_group_details("/app/api").await;
        let daily = details["dailyIncomingBytes"].as_array().unwrap();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0]["bytes"].as_f64(), Some(128.0));
        assert!(daily[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(
            backend.metric_windows()[0].0,
            IngestionMetric::IncomingBytes
        );
    }

    #[tokio::test]
    async fn test_structure() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_stream("/app", stream("s", 1_709_251_400_000));
        for i in 0..4 {
            backend.add_stream_event(
                "/app",
                "s",
                event(1_709_251_200_000 + i, &format!(r#"{{"level":"INFO","seq":{}}}"#, i)),
            );
        }

        let report = resource(backend).log_structure("/app").await;
        assert_eq!(report["format"], "JSON");
        assert_eq!(report["sampleSize"], 4);
        assert_eq!(report["fieldAnalysis"]["uniqueFields"], 2);
    }

    #[tokio::test]
    async fn test_structure_without_events() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.add_stream("/app", stream("s", 1_709_251_400_000));

        let report = resource(backend).log_structure("/app").await;
        assert_eq!(report["error"], "No log events found for analysis");
        assert_eq!(report["error_type"], "NoData");
    }
}
