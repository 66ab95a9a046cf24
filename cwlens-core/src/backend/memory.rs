//! Scripted in-memory backend used by tests and offline demos.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use super::{
    FilteredEvent, IngestionMetric, LogGroupPage, LogGroupSummary, LogStreamSummary, LogsBackend,
    MetricDatapoint, QueryPoll, QueryScope, QueryStatus, ResultField, StreamEvent,
};
use crate::time_range::TimeWindow;

/// A query that reached `start_query`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedQuery {
    pub query_id: String,
    pub scope: QueryScope,
    pub window: TimeWindow,
    pub query: String,
    pub limit: i32,
}

#[derive(Default)]
struct State {
    next_id: usize,
    fifo_scripts: VecDeque<Vec<QueryPoll>>,
    group_scripts: HashMap<String, VecDeque<Vec<QueryPoll>>>,
    running: HashMap<String, VecDeque<QueryPoll>>,
    failing_groups: HashSet<String>,
    submitted: Vec<SubmittedQuery>,
    poll_count: usize,
    groups: Vec<LogGroupSummary>,
    streams: HashMap<String, Vec<LogStreamSummary>>,
    stream_events: HashMap<(String, String), Vec<StreamEvent>>,
    filtered: HashMap<String, Vec<FilteredEvent>>,
    filter_patterns: Vec<String>,
    metrics: HashMap<(String, IngestionMetric), Vec<MetricDatapoint>>,
    metric_windows: Vec<(IngestionMetric, TimeWindow)>,
}

/// Replays scripted poll sequences. A script's last poll repeats once the
/// sequence is exhausted, so `vec![QueryPoll::status(Running)]` never finishes.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Script the next submitted query, whatever its scope.
    pub fn push_script(&self, polls: Vec<QueryPoll>) -> &Self {
        self.state().fifo_scripts.push_back(polls);
        self
    }

    /// Script the next query whose scope starts with `group`.
    pub fn push_group_script(&self, group: &str, polls: Vec<QueryPoll>) -> &Self {
        self.state()
            .group_scripts
            .entry(group.to_string())
            .or_default()
            .push_back(polls);
        self
    }

    /// Shorthand for a query that completes on the first poll.
    pub fn push_rows(&self, rows: Vec<Vec<ResultField>>) -> &Self {
        self.push_script(vec![QueryPoll::complete(rows)])
    }

    pub fn fail_group(&self, group: &str) -> &Self {
        self.state().failing_groups.insert(group.to_string());
        self
    }

    pub fn add_group(&self, group: LogGroupSummary) -> &Self {
        self.state().groups.push(group);
        self
    }

    pub fn add_stream(&self, group: &str, stream: LogStreamSummary) -> &Self {
        self.state()
            .streams
            .entry(group.to_string())
            .or_default()
            .push(stream);
        self
    }

    pub fn add_stream_event(&self, group: &str, stream: &str, event: StreamEvent) -> &Self {
        self.state()
            .stream_events
            .entry((group.to_string(), stream.to_string()))
            .or_default()
            .push(event);
        self
    }

    pub fn add_filtered_event(&self, group: &str, event: FilteredEvent) -> &Self {
        self.state()
            .filtered
            .entry(group.to_string())
            .or_default()
            .push(event);
        self
    }

    pub fn add_metric(
        &self,
        group: &str,
        metric: IngestionMetric,
        timestamp_ms: i64,
        sum: f64,
    ) -> &Self {
        self.state()
            .metrics
            .entry((group.to_string(), metric))
            .or_default()
            .push(MetricDatapoint { timestamp_ms, sum });
        self
    }

    /// Windows of every metric request, in call order.
    pub fn metric_windows(&self) -> Vec<(IngestionMetric, TimeWindow)> {
        self.state().metric_windows.clone()
    }

    pub fn submitted(&self) -> Vec<SubmittedQuery> {
        self.state().submitted.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.state().poll_count
    }

    pub fn filter_patterns(&self) -> Vec<String> {
        self.state().filter_patterns.clone()
    }
}

/// Build a row from `(field, value)` pairs.
pub fn row(cells: &[(&str, &str)]) -> Vec<ResultField> {
    cells
        .iter()
        .map(|(field, value)| ResultField::new(*field, *value))
        .collect()
}

#[async_trait::async_trait]
impl LogsBackend for InMemoryBackend {
    async fn start_query(
        &self,
        scope: &QueryScope,
        window: TimeWindow,
        query: &str,
        limit: i32,
    ) -> Result<String> {
        let mut state = self.state();
        let first_group = scope.groups().into_iter().next().unwrap_or_default();

        if state.failing_groups.contains(&first_group) {
            return Err(anyhow!("ResourceNotFoundException: {} does not exist", first_group));
        }

        let scripted = state
            .group_scripts
            .get_mut(&first_group)
            .and_then(|queue| queue.pop_front());
        let script = match scripted {
            Some(script) => script,
            None => state
                .fifo_scripts
                .pop_front()
                .unwrap_or_else(|| vec![QueryPoll::complete(Vec::new())]),
        };

        state.next_id += 1;
        let query_id = format!("query-{}", state.next_id);
        state.running.insert(query_id.clone(), script.into());
        state.submitted.push(SubmittedQuery {
            query_id: query_id.clone(),
            scope: scope.clone(),
            window,
            query: query.to_string(),
            limit,
        });

        Ok(query_id)
    }

    async fn get_query_results(&self, query_id: &str) -> Result<QueryPoll> {
        let mut state = self.state();
        state.poll_count += 1;

        let polls = state
            .running
            .get_mut(query_id)
            .ok_or_else(|| anyhow!("Unknown query id {}", query_id))?;

        let poll = if polls.len() > 1 {
            polls.pop_front()
        } else {
            polls.front().cloned()
        };

        Ok(poll.unwrap_or_else(|| QueryPoll::status(QueryStatus::Unknown)))
    }

    async fn filter_log_events(
        &self,
        log_group_name: &str,
        filter_pattern: &str,
        _window: TimeWindow,
        limit: i32,
    ) -> Result<Vec<FilteredEvent>> {
        let mut state = self.state();
        if state.failing_groups.contains(log_group_name) {
            return Err(anyhow!("ResourceNotFoundException: {} does not exist", log_group_name));
        }
        state.filter_patterns.push(filter_pattern.to_string());

        Ok(state
            .filtered
            .get(log_group_name)
            .map(|events| events.iter().take(limit.max(0) as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn describe_log_groups(
        &self,
        prefix: Option<&str>,
        limit: i32,
        next_token: Option<&str>,
    ) -> Result<LogGroupPage> {
        let state = self.state();
        let offset = next_token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let matching: Vec<_> = state
            .groups
            .iter()
            .filter(|g| match (prefix, g.name.as_deref()) {
                (Some(prefix), Some(name)) => name.starts_with(prefix),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();

        let end = (offset + limit.max(0) as usize).min(matching.len());
        let groups = matching.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(LogGroupPage { groups, next_token })
    }

    async fn describe_log_streams(
        &self,
        log_group_name: &str,
        limit: i32,
    ) -> Result<Vec<LogStreamSummary>> {
        let state = self.state();
        if state.failing_groups.contains(log_group_name) {
            return Err(anyhow!("ResourceNotFoundException: {} does not exist", log_group_name));
        }
        let mut streams = state.streams.get(log_group_name).cloned().unwrap_or_default();
        streams.sort_by(|a, b| b.last_event_timestamp.cmp(&a.last_event_timestamp));
        streams.truncate(limit.max(0) as usize);
        Ok(streams)
    }

    async fn get_log_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        limit: i32,
    ) -> Result<Vec<StreamEvent>> {
        let state = self.state();
        let events = state
            .stream_events
            .get(&(log_group_name.to_string(), log_stream_name.to_string()))
            .cloned()
            .unwrap_or_default();
        let skip = events.len().saturating_sub(limit.max(0) as usize);
        Ok(events.into_iter().skip(skip).collect())
    }

    async fn hourly_metric_sums(
        &self,
        log_group_name: &str,
        metric: IngestionMetric,
        window: TimeWindow,
    ) -> Result<Vec<MetricDatapoint>> {
        let mut state = self.state();
        if state.failing_groups.contains(log_group_name) {
            return Err(anyhow!("AccessDenied: no metrics for {}", log_group_name));
        }
        state.metric_windows.push((metric, window));

        Ok(state
            .metrics
            .get(&(log_group_name.to_string(), metric))
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.timestamp_ms >= window.start_ms && p.timestamp_ms <= window.end_ms)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &str {
        "in-memory"
    }
}
