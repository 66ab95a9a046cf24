use rmcp::model::JsonObject;
use serde_json::{json, Value};

fn object(schema: Value) -> JsonObject {
    match schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// `hours`, `start_time` and `end_time`, shared by every time-bounded tool.
fn time_range_properties() -> Vec<(&'static str, Value)> {
    vec![
        (
            "hours",
            json!({
                "type": "integer",
                "default": 24,
                "minimum": 1,
                "maximum": crate::validation::MAX_HOURS,
                "description": "Number of hours to look back (ignored when start_time is given)"
            }),
        ),
        (
            "start_time",
            json!({
                "type": "string",
                "description": "Start time in ISO8601 format, e.g. 2024-03-01T00:00:00Z"
            }),
        ),
        (
            "end_time",
            json!({
                "type": "string",
                "description": "End time in ISO8601 format (defaults to now)"
            }),
        ),
    ]
}

fn with_time_range(mut schema: Value) -> JsonObject {
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        for (name, property) in time_range_properties() {
            properties.insert(name.to_string(), property);
        }
    }
    object(schema)
}

/// JSON schema for list_log_groups tool
pub fn list_log_groups_schema() -> JsonObject {
    object(json!({
        "type": "object",
        "properties": {
            "prefix": {
                "type": "string",
                "description": "Optional prefix to filter log groups by name"
            },
            "limit": {
                "type": "integer",
                "default": 50,
                "minimum": 1,
                "maximum": 50
            },
            "next_token": {
                "type": "string",
                "description": "Token for the next page of results"
            }
        }
    }))
}

/// JSON schema for search_logs tool
pub fn search_logs_schema() -> JsonObject {
    with_time_range(json!({
        "type": "object",
        "properties": {
            "log_group_name": { "type": "string" },
            "query": {
                "type": "string",
                "description": "CloudWatch Logs Insights query"
            }
        },
        "required": ["log_group_name", "query"]
    }))
}

/// JSON schema for search_logs_multi tool
pub fn search_logs_multi_schema() -> JsonObject {
    with_time_range(json!({
        "type": "object",
        "properties": {
            "log_group_names": {
                "type": "array",
                "items": { "type": "string" }
            },
            "query": {
                "type": "string",
                "description": "CloudWatch Logs Insights query"
            }
        },
        "required": ["log_group_names", "query"]
    }))
}

/// JSON schema for filter_log_events tool
pub fn filter_log_events_schema() -> JsonObject {
    with_time_range(json!({
        "type": "object",
        "properties": {
            "log_group_name": { "type": "string" },
            "filter_pattern": {
                "type": "string",
                "description": "CloudWatch Logs filter pattern syntax"
            }
        },
        "required": ["log_group_name", "filter_pattern"]
    }))
}

/// JSON schema for summarize_log_activity and find_error_patterns tools
pub fn log_group_analysis_schema() -> JsonObject {
    with_time_range(json!({
        "type": "object",
        "properties": {
            "log_group_name": { "type": "string" }
        },
        "required": ["log_group_name"]
    }))
}

/// JSON schema for correlate_logs tool
pub fn correlate_logs_schema() -> JsonObject {
    with_time_range(json!({
        "type": "object",
        "properties": {
            "log_group_names": {
                "type": "array",
                "items": { "type": "string" }
            },
            "search_term": {
                "type": "string",
                "description": "Literal term shared by the events, e.g. a request id"
            }
        },
        "required": ["log_group_names", "search_term"]
    }))
}
