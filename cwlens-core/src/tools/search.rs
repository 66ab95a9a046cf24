use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use super::envelope::{respond, timeout_envelope};
use super::executor_for;
use crate::config::QuerySettings;
use crate::error::{CwLensError, Result};
use crate::projector;
use crate::session::SessionProvider;
use crate::time_range::{format_epoch_millis, TimeRangeArgs};

pub const SEARCH_TIMEOUT_MESSAGE: &str = "Search query failed to complete within time limit";

/// Insights search and filter-pattern search.
#[derive(Clone)]
pub struct SearchTools {
    session: Arc<dyn SessionProvider>,
    settings: QuerySettings,
}

impl SearchTools {
    pub fn new(session: Arc<dyn SessionProvider>, settings: QuerySettings) -> Self {
        Self { session, settings }
    }

    pub async fn search_logs(&self, log_group_name: &str, query: &str, range: &TimeRangeArgs) -> Value {
        let groups = [log_group_name.to_string()];
        respond("search_logs", self.run_search(&groups, query, range)).await
    }

    pub async fn search_logs_multi(
        &self,
        log_group_names: &[String],
        query: &str,
        range: &TimeRangeArgs,
    ) -> Value {
        respond("search_logs_multi", self.run_search(log_group_names, query, range)).await
    }

    pub async fn filter_log_events(
        &self,
        log_group_name: &str,
        filter_pattern: &str,
        range: &TimeRangeArgs,
    ) -> Value {
        respond(
            "filter_log_events",
            self.run_filter(log_group_name, filter_pattern, range),
        )
        .await
    }

    async fn run_search(&self, groups: &[String], query: &str, range: &TimeRangeArgs) -> Result<Value> {
        let window = range.resolve()?;
        if groups.is_empty() {
            return Err(CwLensError::invalid_input("No log groups specified"));
        }

        let executor = executor_for(&self.session, self.settings).await?;
        let result = executor.execute(groups, query, window, None).await?;

        if result.timed_out() {
            return Ok(timeout_envelope(SEARCH_TIMEOUT_MESSAGE));
        }

        Ok(json!({
            "status": result.status.as_str(),
            "statistics": result.statistics,
            "searchedLogGroups": groups,
            "results": projector::search_results(&result.rows),
        }))
    }

    async fn run_filter(
        &self,
        log_group_name: &str,
        filter_pattern: &str,
        range: &TimeRangeArgs,
    ) -> Result<Value> {
        let window = range.resolve()?;
        let backend = self.session.logs_backend().await?;
        let events = backend
            .filter_log_events(log_group_name, filter_pattern, window, self.settings.default_limit)
            .await?;
        info!("Filter on {} matched {} events", log_group_name, events.len());

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

        Ok(Value::Array(formatted))
    }
}
