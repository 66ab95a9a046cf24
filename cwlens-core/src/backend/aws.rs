//! CloudWatch Logs backend backed by the AWS SDK.
//!
//! Ingestion metrics come from the CloudWatch metrics API, so the backend
//! holds one client per service, both built from the same `SdkConfig`.

use anyhow::{Context, Result};
use aws_sdk_cloudwatch as cloudwatch;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use cloudwatch::primitives::DateTime;
use cloudwatch::types::{Dimension, Statistic};
use cloudwatchlogs::types::OrderBy;
use serde_json::{Map, Value};
use tracing::debug;

use super::{
    FilteredEvent, IngestionMetric, LogGroupPage, LogGroupSummary, LogStreamSummary, LogsBackend,
    MetricDatapoint, QueryPoll, QueryScope, QueryStatus, ResultField, StreamEvent,
};

/// Metric period in seconds.
const HOURLY_PERIOD: i32 = 3600;
use crate::time_range::TimeWindow;

#[derive(Clone)]
pub struct AwsLogsBackend {
    client: cloudwatchlogs::Client,
    metrics: cloudwatch::Client,
}

impl AwsLogsBackend {
    pub fn new(client: cloudwatchlogs::Client, metrics: cloudwatch::Client) -> Self {
        Self { client, metrics }
    }

    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(
            cloudwatchlogs::Client::new(config),
            cloudwatch::Client::new(config),
        )
    }
}

#[async_trait::async_trait]
impl LogsBackend for AwsLogsBackend {
    async fn start_query(
        &self,
        scope: &QueryScope,
        window: TimeWindow,
        query: &str,
        limit: i32,
    ) -> Result<String> {
        // StartQuery takes epoch seconds
        let mut request = self
            .client
            .start_query()
            .start_time(window.start_ms / 1000)
            .end_time(window.end_ms / 1000)
            .query_string(query)
            .limit(limit);

        request = match scope {
            QueryScope::Single(group) => request.log_group_name(group),
            QueryScope::Multiple(groups) => request.set_log_group_names(Some(groups.clone())),
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to start query on {:?}", scope.groups()))?;

        response
            .query_id
            .ok_or_else(|| anyhow::anyhow!("StartQuery returned no query id"))
    }

    async fn get_query_results(&self, query_id: &str) -> Result<QueryPoll> {
        let response = self
            .client
            .get_query_results()
            .query_id(query_id)
            .send()
            .await
            .with_context(|| format!("Failed to get results for query {}", query_id))?;

        let status = response
            .status
            .as_ref()
            .map(|s| s.as_str().parse::<QueryStatus>().unwrap_or(QueryStatus::Unknown))
            .unwrap_or(QueryStatus::Unknown);

        let rows = response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter_map(|cell| {
                        Some(ResultField::new(cell.field?, cell.value.unwrap_or_default()))
                    })
                    .collect()
            })
            .collect();

        let mut statistics = Map::new();
        if let Some(stats) = response.statistics {
            statistics.insert("recordsMatched".to_string(), Value::from(stats.records_matched));
            statistics.insert("recordsScanned".to_string(), Value::from(stats.records_scanned));
            statistics.insert("bytesScanned".to_string(), Value::from(stats.bytes_scanned));
        }

        debug!("Query {} reported status {}", query_id, status);
        Ok(QueryPoll {
            status,
            rows,
            statistics,
        })
    }

    async fn filter_log_events(
        &self,
        log_group_name: &str,
        filter_pattern: &str,
        window: TimeWindow,
        limit: i32,
    ) -> Result<Vec<FilteredEvent>> {
        let response = self
            .client
            .filter_log_events()
            .log_group_name(log_group_name)
            .filter_pattern(filter_pattern)
            .start_time(window.start_ms)
            .end_time(window.end_ms)
            .limit(limit)
            .send()
            .await
            .with_context(|| {
                format!("Failed to filter log events from log group: {}", log_group_name)
            })?;

        Ok(response
            .events
            .unwrap_or_default()
            .into_iter()
            .map(|event| FilteredEvent {
                timestamp: event.timestamp.unwrap_or(0),
                message: event.message,
                log_stream_name: event.log_stream_name,
            })
            .collect())
    }

    async fn describe_log_groups(
        &self,
        prefix: Option<&str>,
        limit: i32,
        next_token: Option<&str>,
    ) -> Result<LogGroupPage> {
        let mut request = self.client.describe_log_groups().limit(limit);

        if let Some(prefix) = prefix {
            request = request.log_group_name_prefix(prefix);
        }
        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| "Failed to list log groups")?;

        let groups = response
            .log_groups
            .unwrap_or_default()
            .into_iter()
            .map(|group| LogGroupSummary {
                name: group.log_group_name,
                arn: group.arn,
                stored_bytes: group.stored_bytes,
                creation_time: group.creation_time,
                retention_in_days: group.retention_in_days,
                metric_filter_count: group.metric_filter_count,
                kms_key_id: group.kms_key_id,
            })
            .collect();

        Ok(LogGroupPage {
            groups,
            next_token: response.next_token,
        })
    }

    async fn describe_log_streams(
        &self,
        log_group_name: &str,
        limit: i32,
    ) -> Result<Vec<LogStreamSummary>> {
        let response = self
            .client
            .describe_log_streams()
            .log_group_name(log_group_name)
            .order_by(OrderBy::LastEventTime)
            .descending(true)
            .limit(limit)
            .send()
            .await
            .with_context(|| {
                format!("Failed to list log streams for log group: {}", log_group_name)
            })?;

        #[allow(deprecated)]
        let streams = response
            .log_streams
            .unwrap_or_default()
            .into_iter()
            .map(|stream| LogStreamSummary {
                name: stream.log_stream_name,
                first_event_timestamp: stream.first_event_timestamp,
                last_event_timestamp: stream.last_event_timestamp,
                stored_bytes: stream.stored_bytes,
            })
            .collect();

        Ok(streams)
    }

    async fn get_log_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        limit: i32,
    ) -> Result<Vec<StreamEvent>> {
        let response = self
            .client
            .get_log_events()
            .log_group_name(log_group_name)
            .log_stream_name(log_stream_name)
            .limit(limit)
            .start_from_head(false)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to get log events from {}/{}",
                    log_group_name, log_stream_name
                )
            })?;

        Ok(response
            .events
            .unwrap_or_default()
            .into_iter()
            .map(|event| StreamEvent {
                timestamp: event.timestamp.unwrap_or(0),
                message: event.message,
                ingestion_time: event.ingestion_time.unwrap_or(0),
            })
            .collect())
    }

    async fn hourly_metric_sums(
        &self,
        log_group_name: &str,
        metric: IngestionMetric,
        window: TimeWindow,
    ) -> Result<Vec<MetricDatapoint>> {
        let response = self
            .metrics
            .get_metric_statistics()
            .namespace(IngestionMetric::NAMESPACE)
            .metric_name(metric.metric_name())
            .dimensions(
                Dimension::builder()
                    .name("LogGroupName")
                    .value(log_group_name)
                    .build(),
            )
            .start_time(DateTime::from_millis(window.start_ms))
            .end_time(DateTime::from_millis(window.end_ms))
            .period(HOURLY_PERIOD)
            .statistics(Statistic::Sum)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to get {} metrics for log group: {}",
                    metric.metric_name(),
                    log_group_name
                )
            })?;

        let datapoints: Vec<MetricDatapoint> = response
            .datapoints
            .unwrap_or_default()
            .into_iter()
            .filter_map(|point| {
                let timestamp_ms = point.timestamp?.to_millis().ok()?;
                Some(MetricDatapoint {
                    timestamp_ms,
                    sum: point.sum.unwrap_or(0.0),
                })
            })
            .collect();

        debug!(
            "{} returned {} datapoints for {}",
            metric.metric_name(),
            datapoints.len(),
            log_group_name
        );
        Ok(datapoints)
    }

    fn backend_name(&self) -> &str {
        "cloudwatch-logs"
    }
}
