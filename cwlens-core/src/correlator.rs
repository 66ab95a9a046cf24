//! Cross-group correlation on a shared literal search term.

use futures::future::join_all;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::backend::QueryStatus;
use crate::error::{CwLensError, Result};
use crate::projector::{self, CorrelatedEvent};
use crate::query::QueryExecutor;
use crate::time_range::TimeWindow;

const EVENTS_PER_GROUP: i32 = 100;

/// What one group contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCorrelation {
    pub log_group: String,
    pub status: QueryStatus,
    pub events: Vec<CorrelatedEvent>,
    pub error: Option<String>,
}

impl GroupCorrelation {
    fn to_json(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("eventCount".to_string(), json!(self.events.len()));
        entry.insert("events".to_string(), json!(self.events));
        if self.status != QueryStatus::Complete {
            entry.insert("status".to_string(), json!(self.status.as_str()));
        }
        if let Some(error) = &self.error {
            entry.insert("error".to_string(), json!(error));
        }
        Value::Object(entry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationReport {
    pub search_term: String,
    pub groups: Vec<GroupCorrelation>,
    /// Every group's events, ascending by timestamp.
    pub timeline: Vec<CorrelatedEvent>,
}

impl CorrelationReport {
    pub fn to_json(&self, time_range: Value) -> Value {
        let mut log_groups = Map::new();
        for group in &self.groups {
            log_groups.insert(group.log_group.clone(), group.to_json());
        }
        json!({
            "timeRange": time_range,
            "searchTerm": self.search_term,
            "logGroups": log_groups,
            "correlatedEvents": self.timeline,
        })
    }
}

/// Insights query matching `term` literally.
pub fn correlation_query(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "filter @message like \"{}\" | sort @timestamp asc | limit {}",
        escaped, EVENTS_PER_GROUP
    )
}

/// Both a group and a search term are needed before anything is queried.
pub fn check_inputs(groups: &[String], search_term: &str) -> Result<()> {
    if groups.is_empty() {
        return Err(CwLensError::invalid_input("No log groups specified"));
    }
    if search_term.is_empty() {
        return Err(CwLensError::invalid_input("No search term specified"));
    }
    Ok(())
}

pub struct MultiGroupCorrelator {
    executor: QueryExecutor,
    concurrent: bool,
}

impl MultiGroupCorrelator {
    pub fn new(executor: QueryExecutor) -> Self {
        let concurrent = executor.settings().concurrent_correlation;
        Self { executor, concurrent }
    }

    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub async fn correlate(
        &self,
        groups: &[String],
        search_term: &str,
        window: TimeWindow,
    ) -> Result<CorrelationReport> {
        check_inputs(groups, search_term)?;

        let query = correlation_query(search_term);
        info!(
            "Correlating '{}' across {} log groups ({})",
            search_term,
            groups.len(),
            if self.concurrent { "concurrent" } else { "sequential" }
        );

        let per_group = if self.concurrent {
            join_all(
                groups
                    .iter()
                    .map(|group| self.correlate_group(group, &query, window)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(groups.len());
            for group in groups {
                results.push(self.correlate_group(group, &query, window).await);
            }
            results
        };

        let timeline = projector::merge_timeline(
            per_group.iter().flat_map(|group| group.events.iter().cloned()),
        );

        Ok(CorrelationReport {
            search_term: search_term.to_string(),
            groups: per_group,
            timeline,
        })
    }

    /// Never fails: a broken group is reported with an empty event list.
    async fn correlate_group(&self, group: &str, query: &str, window: TimeWindow) -> GroupCorrelation {
        let groups = [group.to_string()];
        match self
            .executor
            .execute(&groups, query, window, Some(EVENTS_PER_GROUP))
            .await
        {
            Ok(result) => {
                if !result.is_complete() {
                    warn!("Correlation query on {} ended with {}", group, result.status);
                }
                GroupCorrelation {
                    log_group: group.to_string(),
                    status: result.status,
                    events: projector::correlated_events(group, &result.rows),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Correlation query on {} failed: {}", group, e);
                GroupCorrelation {
                    log_group: group.to_string(),
                    status: QueryStatus::Failed,
                    events: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::row;
    use crate::backend::{InMemoryBackend, QueryPoll};
    use crate::config::QuerySettings;
    use std::sync::Arc;

    fn window() -> TimeWindow {
        TimeWindow::new(1_700_000_000_000, 1_700_003_600_000)
    }

    fn names(groups: &[&str]) -> Vec<String> {
        groups.iter().map(|s| s.to_string()).collect()
    }

    fn correlator(backend: Arc<InMemoryBackend>) -> MultiGroupCorrelator {
        MultiGroupCorrelator::new(QueryExecutor::new(backend, QuerySettings::default()))
    }

    fn scripted_backend() -> Arc<InMemoryBackend> {
        let backend = Arc::new(InMemoryBackend::new());
        backend.push_group_script(
            "A",
            vec![QueryPoll::complete(vec![
                row(&[("@timestamp", "2024-03-01 10:00:00.000"), ("@message", "req-42 start")]),
                row(&[("@timestamp", "2024-03-01 10:00:02.000"), ("@message", "req-42 done")]),
            ])],
        );
        backend.push_group_script(
            "B",
            vec![QueryPoll::complete(vec![row(&[
                ("@timestamp", "2024-03-01 10:00:01.000"),
                ("@message", "req-42 downstream"),
                ("@logStream", "b-stream"),
            ])])],
        );
        backend
    }

    #[test]
    fn test_query_escapes_term() {
        assert_eq!(
            correlation_query(r#"say "hi" \o/"#),
            r#"filter @message like "say \"hi\" \\o/" | sort @timestamp asc | limit 100"#
        );
    }

    #[tokio::test]
    async fn test_rejects_empty_inputs() {
        let backend = Arc::new(InMemoryBackend::new());
        let correlator = correlator(backend.clone());

        let err = correlator.correlate(&[], "x", window()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: No log groups specified");

        let err = correlator.correlate(&names(&["A"]), "", window()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: No search term specified");

        assert!(backend.submitted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_merges_groups_in_timestamp_order() {
        let report = correlator(scripted_backend())
            .correlate(&names(&["A", "B"]), "req-42", window())
            .await
            .unwrap();

        assert_eq!(report.groups[0].events.len(), 2);
        assert_eq!(report.groups[1].events.len(), 1);
        let order: Vec<_> = report.timeline.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(order, vec!["req-42 start", "req-42 downstream", "req-42 done"]);

        let rendered = report.to_json(json!({}));
        assert_eq!(rendered["logGroups"]["A"]["eventCount"], 2);
        assert_eq!(rendered["logGroups"]["B"]["eventCount"], 1);
        assert!(rendered["logGroups"]["A"].get("status").is_none());
        assert_eq!(rendered["correlatedEvents"][1]["logStream"], "b-stream");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_matches_sequential() {
        let sequential = correlator(scripted_backend())
            .correlate(&names(&["A", "B"]), "req-42", window())
            .await
            .unwrap();
        let concurrent = correlator(scripted_backend())
            .concurrent(true)
            .correlate(&names(&["A", "B"]), "req-42", window())
            .await
            .unwrap();
        assert_eq!(sequential, concurrent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_group_is_isolated() {
        let backend = scripted_backend();
        backend.fail_group("missing");

        let report = correlator(backend)
            .correlate(&names(&["A", "missing", "B"]), "req-42", window())
            .await
            .unwrap();

        assert_eq!(report.timeline.len(), 3);
        let missing = &report.groups[1];
        assert_eq!(missing.status, QueryStatus::Failed);
        assert!(missing.events.is_empty());
        assert!(missing.error.as_deref().unwrap_or_default().contains("ResourceNotFoundException"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_group_contributes_empty_list() {
        let backend = scripted_backend();
        backend.push_group_script("slow", vec![QueryPoll::status(QueryStatus::Running)]);

        let report = correlator(backend)
            .concurrent(true)
            .correlate(&names(&["slow", "B"]), "req-42", window())
            .await
            .unwrap();

        let rendered = report.to_json(json!({}));
        assert_eq!(rendered["logGroups"]["slow"]["status"], "Timeout");
        assert_eq!(rendered["logGroups"]["slow"]["eventCount"], 0);
        assert_eq!(rendered["logGroups"]["B"]["eventCount"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rows_without_message_are_dropped() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.push_group_script(
            "A",
            vec![QueryPoll::complete(vec![row(&[("@timestamp", "2024-03-01 10:00:00.000")])])],
        );

        let report = correlator(backend)
            .correlate(&names(&["A"]), "x", window())
            .await
            .unwrap();
        assert!(report.groups[0].events.is_empty());
        assert!(report.timeline.is_empty());
    }
}
