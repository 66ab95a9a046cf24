use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::envelope::{respond, timeout_envelope};
use super::executor_for;
use crate::config::QuerySettings;
use crate::error::Result;
use crate::projector;
use crate::query::QueryResult;
use crate::session::SessionProvider;
use crate::time_range::TimeRangeArgs;

pub const SUMMARY_QUERY: &str =
    "stats count(*) as logEvents, count_distinct(@logStream) as streams | limit 1000";
pub const HOURLY_QUERY: &str = "stats count(*) as count by bin(1h) | sort bin(1h) desc | limit 24";
pub const ERROR_PATTERN_QUERY: &str = "filter @message like /(?i)(error|exception|fail|traceback)/ \
     | stats count(*) as errorCount by @message \
     | sort errorCount desc \
     | limit 20";

/// Activity summaries and error-pattern detection over one log group.
#[derive(Clone)]
pub struct AnalysisTools {
    session: Arc<dyn SessionProvider>,
    settings: QuerySettings,
}

/// First non-complete status among `results`, if any.
fn degraded_status<'a>(results: impl IntoIterator<Item = &'a QueryResult>) -> Option<&'static str> {
    results
        .into_iter()
        .find(|result| !result.is_complete())
        .map(|result| result.status.as_str())
}

impl AnalysisTools {
    pub fn new(session: Arc<dyn SessionProvider>, settings: QuerySettings) -> Self {
        Self { session, settings }
    }

    pub async fn summarize_log_activity(&self, log_group_name: &str, range: &TimeRangeArgs) -> Value {
        respond("summarize_log_activity", self.run_summary(log_group_name, range)).await
    }

    pub async fn find_error_patterns(&self, log_group_name: &str, range: &TimeRangeArgs) -> Value {
        respond("find_error_patterns", self.run_error_patterns(log_group_name, range)).await
    }

    async fn run_summary(&self, log_group_name: &str, range: &TimeRangeArgs) -> Result<Value> {
        let window = range.resolve()?;
        let executor = executor_for(&self.session, self.settings).await?;
        let groups = [log_group_name.to_string()];

        let summary = executor.execute(&groups, SUMMARY_QUERY, window, None).await?;
        if summary.timed_out() {
            return Ok(timeout_envelope(
                "Summary query failed to complete within time limit",
            ));
        }

        let hourly = executor.execute(&groups, HOURLY_QUERY, window, None).await?;
        if hourly.timed_out() {
            return Ok(timeout_envelope(
                "Hourly distribution query failed to complete within time limit",
            ));
        }

        let counts = projector::activity_counts(&summary.rows)?;
        let mut response = Map::new();
        response.insert("timeRange".to_string(), window.describe(range.hours));
        response.insert("logEvents".to_string(), json!(counts.log_events));
        response.insert("uniqueStreams".to_string(), json!(counts.unique_streams));
        response.insert(
            "hourlyDistribution".to_string(),
            Value::Array(projector::hourly_distribution(&hourly.rows)?),
        );
        if let Some(status) = degraded_status([&summary, &hourly]) {
            response.insert("status".to_string(), json!(status));
        }

        Ok(Value::Object(response))
    }

    async fn run_error_patterns(&self, log_group_name: &str, range: &TimeRangeArgs) -> Result<Value> {
        let window = range.resolve()?;
        let executor = executor_for(&self.session, self.settings).await?;
        let groups = [log_group_name.to_string()];

        let result = executor
            .execute(&groups, ERROR_PATTERN_QUERY, window, None)
            .await?;
        if result.timed_out() {
            return Ok(timeout_envelope(
                "Error pattern query failed to complete within time limit",
            ));
        }

        let mut response = Map::new();
        response.insert("timeRange".to_string(), window.describe(range.hours));
        response.insert(
            "errorPatterns".to_string(),
            Value::Array(projector::error_patterns(&result.rows)?),
        );
        if let Some(status) = degraded_status([&result]) {
            response.insert("status".to_string(), json!(status));
        }

        Ok(Value::Object(response))
    }
}
