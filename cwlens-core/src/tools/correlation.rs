use std::sync::Arc;

use serde_json::Value;

use super::envelope::respond;
use super::executor_for;
use crate::config::QuerySettings;
use crate::correlator::{check_inputs, MultiGroupCorrelator};
use crate::error::Result;
use crate::session::SessionProvider;
use crate::time_range::TimeRangeArgs;

#[derive(Clone)]
pub struct CorrelationTools {
    session: Arc<dyn SessionProvider>,
    settings: QuerySettings,
}

impl CorrelationTools {
    pub fn new(session: Arc<dyn SessionProvider>, settings: QuerySettings) -> Self {
        Self { session, settings }
    }

    pub async fn correlate_logs(
        &self,
        log_group_names: &[String],
        search_term: &str,
        range: &TimeRangeArgs,
    ) -> Value {
        respond(
            "correlate_logs",
            self.run_correlation(log_group_names, search_term, range),
        )
        .await
    }

    async fn run_correlation(
        &self,
        log_group_names: &[String],
        search_term: &str,
        range: &TimeRangeArgs,
    ) -> Result<Value> {
        let window = range.resolve()?;
        check_inputs(log_group_names, search_term)?;
        let executor = executor_for(&self.session, self.settings).await?;
        let report = MultiGroupCorrelator::new(executor)
            .correlate(log_group_names, search_term, window)
            .await?;
        Ok(report.to_json(window.describe(range.hours)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::row;
    use crate::backend::{InMemoryBackend, QueryPoll};
    use crate::session::StaticSessionProvider;
    use serde_json::json;

    fn tools(backend: Arc<InMemoryBackend>) -> CorrelationTools {
        CorrelationTools::new(
            Arc::new(StaticSessionProvider::new(backend)),
            QuerySettings::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_groups_is_structured_error() {
        let backend = Arc::new(InMemoryBackend::new());
        let value = tools(backend)
            .correlate_logs(&[], "req-1", &TimeRangeArgs::default())
            .await;
        assert_eq!(value["status"], "Error");
        assert_eq!(value["error"], "Invalid input: No log groups specified");
        assert_eq!(value["error_type"], "InvalidInput");
    }

    struct UnavailableSession;

    #[async_trait::async_trait]
    impl SessionProvider for UnavailableSession {
        async fn logs_backend(&self) -> anyhow::Result<Arc<dyn crate::backend::LogsBackend>> {
            Err(anyhow::anyhow!("no credentials in the default chain"))
        }

        fn describe(&self) -> String {
            "unavailable".to_string()
        }
    }

    #[tokio::test]
    async fn test_input_errors_win_over_session_failures() {
        let tools = CorrelationTools::new(Arc::new(UnavailableSession), QuerySettings::default());

        let value = tools.correlate_logs(&[], "req-1", &TimeRangeArgs::default()).await;
        assert_eq!(value["error_type"], "InvalidInput");
        assert_eq!(value["error"], "Invalid input: No log groups specified");

        let value = tools
            .correlate_logs(&["/a".to_string()], "", &TimeRangeArgs::default())
            .await;
        assert_eq!(value["error_type"], "InvalidInput");

        let value = tools
            .correlate_logs(&["/a".to_string()], "req-1", &TimeRangeArgs::default())
            .await;
        assert_eq!(value["error_type"], "BackendError");
    }

    #[tokio::test]
    async fn test_empty_term_is_structured_error() {
        let backend = Arc::new(InMemoryBackend::new());
        let value = tools(backend)
            .correlate_logs(&["/a".to_string()], "", &TimeRangeArgs::default())
            .await;
        assert_eq!(value["error"], "Invalid input: No search term specified");
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_response_shape() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.push_group_script(
            "/a",
            vec![QueryPoll::complete(vec![row(&[
                ("@timestamp", "2024-03-01 00:10:00.000"),
                ("@message", "order 7 placed"),
            ])])],
        );

        let range = TimeRangeArgs::hours(1).with_bounds(
            Some("2024-03-01T00:00:00Z".to_string()),
            Some("2024-03-01T01:00:00Z".to_string()),
        );
        let value = tools(backend)
            .correlate_logs(&["/a".to_string(), "/b".to_string()], "order 7", &range)
            .await;

        assert_eq!(
            value,
            json!({
                "timeRange": {
                    "start": "2024-03-01T00:00:00.000Z",
                    "end": "2024-03-01T01:00:00.000Z",
                    "hours": 1,
                },
                "searchTerm": "order 7",
                "logGroups": {
                    "/a": {
                        "eventCount": 1,
                        "events": [{
                            "logGroup": "/a",
                            "timestamp": "2024-03-01 00:10:00.000",
                            "message": "order 7 placed",
                        }],
                    },
                    "/b": {"eventCount": 0, "events": []},
                },
                "correlatedEvents": [{
                    "logGroup": "/a",
                    "timestamp": "2024-03-01 00:10:00.000",
                    "message": "order 7 placed",
                }],
            })
        );
    }
}
