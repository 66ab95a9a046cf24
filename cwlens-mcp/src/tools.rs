//! Tool catalogue and argument decoding.

use std::sync::Arc;

use cwlens_core::tools::error_envelope;
use cwlens_core::{CwLensError, TimeRangeArgs, Toolset};
use rmcp::model::Tool;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::schema;

pub const TOOL_NAMES: &[&str] = &[
    "list_log_groups",
    "search_logs",
    "search_logs_multi",
    "filter_log_events",
    "summarize_log_activity",
    "find_error_patterns",
    "correlate_logs",
];

#[derive(Debug, Deserialize)]
pub struct ListLogGroupsArgs {
    pub prefix: Option<String>,
    pub limit: Option<i32>,
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchLogsArgs {
    pub log_group_name: String,
    pub query: String,
    #[serde(flatten)]
    pub range: TimeRangeArgs,
}

#[derive(Debug, Deserialize)]
pub struct SearchLogsMultiArgs {
    pub log_group_names: Vec<String>,
    pub query: String,
    #[serde(flatten)]
    pub range: TimeRangeArgs,
}

#[derive(Debug, Deserialize)]
pub struct FilterLogEventsArgs {
    pub log_group_name: String,
    pub filter_pattern: String,
    #[serde(flatten)]
    pub range: TimeRangeArgs,
}

#[derive(Debug, Deserialize)]
pub struct LogGroupRangeArgs {
    pub log_group_name: String,
    #[serde(flatten)]
    pub range: TimeRangeArgs,
}

#[derive(Debug, Deserialize)]
pub struct CorrelateLogsArgs {
    pub log_group_names: Vec<String>,
    pub search_term: String,
    #[serde(flatten)]
    pub range: TimeRangeArgs,
}

fn tool(name: &'static str, description: &'static str, input_schema: rmcp::model::JsonObject) -> Tool {
    Tool {
        name: name.into(),
        description: Some(description.into()),
        input_schema: Arc::new(input_schema),
        annotations: Default::default(),
    }
}

pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool(
            "list_log_groups",
            "List CloudWatch log groups, optionally filtered by name prefix",
            schema::list_log_groups_schema(),
        ),
        tool(
            "search_logs",
            "Run a CloudWatch Logs Insights query against one log group",
            schema::search_logs_schema(),
        ),
        tool(
            "search_logs_multi",
            "Run a CloudWatch Logs Insights query across several log groups at once",
            schema::search_logs_multi_schema(),
        ),
        tool(
            "filter_log_events",
            "Find log events matching a CloudWatch Logs filter pattern",
            schema::filter_log_events_schema(),
        ),
        tool(
            "summarize_log_activity",
            "Summarize event volume, stream count and hourly distribution of a log group",
            schema::log_group_analysis_schema(),
        ),
        tool(
            "find_error_patterns",
            "Find the most frequent error messages in a log group",
            schema::log_group_analysis_schema(),
        ),
        tool(
            "correlate_logs",
            "Correlate events sharing a search term across log groups into one timeline",
            schema::correlate_logs_schema(),
        ),
    ]
}

fn decode<T: DeserializeOwned>(arguments: Value) -> Result<T, CwLensError> {
    serde_json::from_value(arguments)
        .map_err(|e| CwLensError::invalid_input(format!("Malformed arguments: {}", e)))
}

/// Run a known tool. Returns `None` for unknown tool names.
pub async fn call(toolset: &Toolset, tool_name: &str, arguments: Value) -> Option<Value> {
    dispatch(toolset, tool_name, arguments)
        .await
        .unwrap_or_else(|e| Some(error_envelope(&e)))
}

async fn dispatch(
    toolset: &Toolset,
    tool_name: &str,
    arguments: Value,
) -> Result<Option<Value>, CwLensError> {
    let value = match tool_name {
        "list_log_groups" => {
            let args: ListLogGroupsArgs = decode(arguments)?;
            toolset
                .resources
                .list_log_groups(args.prefix.as_deref(), args.limit, args.next_token.as_deref())
                .await
        }
        "search_logs" => {
            let args: SearchLogsArgs = decode(arguments)?;
            toolset
                .search
                .search_logs(&args.log_group_name, &args.query, &args.range)
                .await
        }
        "search_logs_multi" => {
            let args: SearchLogsMultiArgs = decode(arguments)?;
            toolset
                .search
                .search_logs_multi(&args.log_group_names, &args.query, &args.range)
                .await
        }
        "filter_log_events" => {
            let args: FilterLogEventsArgs = decode(arguments)?;
            toolset
                .search
                .filter_log_events(&args.log_group_name, &args.filter_pattern, &args.range)
                .await
        }
        "summarize_log_activity" => {
            let args: LogGroupRangeArgs = decode(arguments)?;
            toolset
                .analysis
                .summarize_log_activity(&args.log_group_name, &args.range)
                .await
        }
        "find_error_patterns" => {
            let args: LogGroupRangeArgs = decode(arguments)?;
            toolset
                .analysis
                .find_error_patterns(&args.log_group_name, &args.range)
                .await
        }
        "correlate_logs" => {
            let args: CorrelateLogsArgs = decode(arguments)?;
            toolset
                .correlation
                .correlate_logs(&args.log_group_names, &args.search_term, &args.range)
                .await
        }
        _ => return Ok(None),
    };

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalogue_matches_names() {
        let names: Vec<_> = tool_definitions()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, TOOL_NAMES);
    }

    #[test]
    fn test_range_defaults_to_24_hours() {
        let args: LogGroupRangeArgs = decode(json!({"log_group_name": "/app"})).unwrap();
        assert_eq!(args.range.hours, 24);
        assert!(args.range.start_time.is_none());
    }

    #[test]
    fn test_range_fields_are_flattened() {
        let args: SearchLogsArgs = decode(json!({
            "log_group_name": "/app",
            "query": "fields @message",
            "hours": 3,
            "start_time": "2024-03-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(args.range.hours, 3);
        assert_eq!(args.range.start_time.as_deref(), Some("2024-03-01T00:00:00Z"));
    }
}
