//! Log-query backend capability.
//!
//! The core never talks to CloudWatch Logs directly. Everything goes through
//! [`LogsBackend`], obtained per invocation from a
//! [`SessionProvider`](crate::session::SessionProvider).

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::time_range::TimeWindow;

#[cfg(feature = "aws")]
pub mod aws;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

#[cfg(feature = "aws")]
pub use aws::AwsLogsBackend;
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryBackend;

/// Log groups a single Insights query runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryScope {
    /// Returns `None` for an empty group list.
    pub fn from_groups(groups: &[String]) -> Option<Self> {
        match groups {
            [] => None,
            [single] => Some(QueryScope::Single(single.clone())),
            many => Some(QueryScope::Multiple(many.to_vec())),
        }
    }

    pub fn groups(&self) -> Vec<String> {
        match self {
            QueryScope::Single(group) => vec![group.clone()],
            QueryScope::Multiple(groups) => groups.clone(),
        }
    }
}

/// Insights query lifecycle states.
///
/// `Timeout` is also synthesized locally when polling gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    Unknown,
}

impl QueryStatus {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, QueryStatus::Scheduled | QueryStatus::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_in_flight()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Scheduled => "Scheduled",
            QueryStatus::Running => "Running",
            QueryStatus::Complete => "Complete",
            QueryStatus::Failed => "Failed",
            QueryStatus::Cancelled => "Cancelled",
            QueryStatus::Timeout => "Timeout",
            QueryStatus::Unknown => "Unknown",
        }
    }
}

impl std::str::FromStr for QueryStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "Scheduled" => QueryStatus::Scheduled,
            "Running" => QueryStatus::Running,
            "Complete" => QueryStatus::Complete,
            "Failed" => QueryStatus::Failed,
            "Cancelled" => QueryStatus::Cancelled,
            "Timeout" => QueryStatus::Timeout,
            _ => QueryStatus::Unknown,
        })
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{field, value}` cell of an Insights result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultField {
    pub field: String,
    pub value: String,
}

impl ResultField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// What one `get_query_results` call reports.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPoll {
    pub status: QueryStatus,
    pub rows: Vec<Vec<ResultField>>,
    pub statistics: serde_json::Map<String, serde_json::Value>,
}

impl QueryPoll {
    pub fn status(status: QueryStatus) -> Self {
        Self {
            status,
            rows: Vec::new(),
            statistics: serde_json::Map::new(),
        }
    }

    pub fn complete(rows: Vec<Vec<ResultField>>) -> Self {
        Self {
            status: QueryStatus::Complete,
            rows,
            statistics: serde_json::Map::new(),
        }
    }
}

/// Event returned by `filter_log_events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredEvent {
    pub timestamp: i64,
    pub message: Option<String>,
    pub log_stream_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroupSummary {
    pub name: Option<String>,
    pub arn: Option<String>,
    pub stored_bytes: Option<i64>,
    pub creation_time: Option<i64>,
    pub retention_in_days: Option<i32>,
    pub metric_filter_count: Option<i32>,
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogGroupPage {
    pub groups: Vec<LogGroupSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStreamSummary {
    pub name: Option<String>,
    pub first_event_timestamp: Option<i64>,
    pub last_event_timestamp: Option<i64>,
    pub stored_bytes: Option<i64>,
}

/// Event returned by `get_log_events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub timestamp: i64,
    pub message: Option<String>,
    pub ingestion_time: i64,
}

/// Per-group ingestion metrics published under the `AWS/Logs` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestionMetric {
    IncomingBytes,
    IncomingLogEvents,
}

impl IngestionMetric {
    pub const NAMESPACE: &'static str = "AWS/Logs";

    pub fn metric_name(&self) -> &'static str {
        match self {
            IngestionMetric::IncomingBytes => "IncomingBytes",
            IngestionMetric::IncomingLogEvents => "IncomingLogEvents",
        }
    }
}

/// One hourly `Sum` datapoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDatapoint {
    pub timestamp_ms: i64,
    pub sum: f64,
}

#[async_trait::async_trait]
pub trait LogsBackend: Send + Sync {
    /// Submit an Insights query and return its handle.
    async fn start_query(
        &self,
        scope: &QueryScope,
        window: TimeWindow,
        query: &str,
        limit: i32,
    ) -> Result<String>;

    async fn get_query_results(&self, query_id: &str) -> Result<QueryPoll>;

    async fn filter_log_events(
        &self,
        log_group_name: &str,
        filter_pattern: &str,
        window: TimeWindow,
        limit: i32,
    ) -> Result<Vec<FilteredEvent>>;

    async fn describe_log_groups(
        &self,
        prefix: Option<&str>,
        limit: i32,
        next_token: Option<&str>,
    ) -> Result<LogGroupPage>;

    /// Streams ordered by last event time, newest first.
    async fn describe_log_streams(
        &self,
        log_group_name: &str,
        limit: i32,
    ) -> Result<Vec<LogStreamSummary>>;

    /// Most recent events of a stream.
    async fn get_log_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        limit: i32,
    ) -> Result<Vec<StreamEvent>>;

    /// Hourly sums of `metric` for one log group, in no particular order.
    async fn hourly_metric_sums(
        &self,
        log_group_name: &str,
        metric: IngestionMetric,
        window: TimeWindow,
    ) -> Result<Vec<MetricDatapoint>>;

    fn backend_name(&self) -> &str;
}
