//! Insights query execution: submit once, poll until terminal or out of time.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::backend::{LogsBackend, QueryPoll, QueryScope, QueryStatus, ResultField};
use crate::config::QuerySettings;
use crate::error::{CwLensError, Result};
use crate::time_range::TimeWindow;

/// One result row as the service returned it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowRecord {
    fields: Vec<ResultField>,
}

impl RowRecord {
    pub fn new(fields: Vec<ResultField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[ResultField] {
        &self.fields
    }

    /// Value of `field`. With duplicates the last one wins.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|cell| cell.field == field)
            .map(|cell| cell.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field map in the order the service reported the fields.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for cell in &self.fields {
            map.insert(cell.field.clone(), Value::String(cell.value.clone()));
        }
        map
    }
}

impl From<Vec<ResultField>> for RowRecord {
    fn from(fields: Vec<ResultField>) -> Self {
        Self::new(fields)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub status: QueryStatus,
    pub rows: Vec<RowRecord>,
    pub statistics: Map<String, Value>,
}

impl QueryResult {
    /// Locally synthesized result for a query that ran out of time.
    pub fn timeout() -> Self {
        Self {
            status: QueryStatus::Timeout,
            rows: Vec::new(),
            statistics: Map::new(),
        }
    }

    pub fn timed_out(&self) -> bool {
        self.status == QueryStatus::Timeout
    }

    pub fn is_complete(&self) -> bool {
        self.status == QueryStatus::Complete
    }
}

impl From<QueryPoll> for QueryResult {
    fn from(poll: QueryPoll) -> Self {
        Self {
            status: poll.status,
            rows: poll.rows.into_iter().map(RowRecord::from).collect(),
            statistics: poll.statistics,
        }
    }
}

/// Runs Insights queries against a backend.
///
/// Each call submits exactly one query and owns its handle. There are no retries
/// and no cancellation: a query still running when time is up is left to the
/// service and reported as [`QueryStatus::Timeout`].
#[derive(Clone)]
pub struct QueryExecutor {
    backend: Arc<dyn LogsBackend>,
    settings: QuerySettings,
}

impl QueryExecutor {
    pub fn new(backend: Arc<dyn LogsBackend>, settings: QuerySettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub async fn execute(
        &self,
        groups: &[String],
        query: &str,
        window: TimeWindow,
        limit: Option<i32>,
    ) -> Result<QueryResult> {
        let scope = QueryScope::from_groups(groups)
            .ok_or_else(|| CwLensError::invalid_input("No log groups specified"))?;
        let limit = limit.unwrap_or(self.settings.default_limit);

        let query_id = self
            .backend
            .start_query(&scope, window, query, limit)
            .await?;
        info!("Started query {} on {:?}", query_id, scope.groups());

        let submitted_at = Instant::now();
        loop {
            // Never sleep past the deadline
            let remaining = self.settings.timeout.saturating_sub(submitted_at.elapsed());
            sleep(self.settings.poll_interval.min(remaining)).await;

            let poll = self.backend.get_query_results(&query_id).await?;
            debug!("Query {} status: {}", query_id, poll.status);

            if poll.status.is_terminal() {
                info!(
                    "Query {} finished with {} ({} rows)",
                    query_id,
                    poll.status,
                    poll.rows.len()
                );
                return Ok(QueryResult::from(poll));
            }

            if submitted_at.elapsed() >= self.settings.timeout {
                warn!(
                    "Query {} still {} after {:?}, giving up",
                    query_id, poll.status, self.settings.timeout
                );
                return Ok(QueryResult::timeout());
            }
        }
    }
}
