use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

/// Longest look-back accepted, matching the longest log retention (3653 days).
pub const MAX_HOURS: i64 = 3653 * 24;

/// Validate input parameters against the expected schema
pub fn validate_tool_params(tool_name: &str, params: &Value) -> Result<()> {
    let map = params
        .as_object()
        .ok_or_else(|| anyhow!("Parameters must be an object"))?;

    match tool_name {
        "list_log_groups" => validate_list_log_groups(map),
        "search_logs" => {
            require_string(map, "log_group_name")?;
            require_string(map, "query")?;
            validate_time_range(map)
        }
        "search_logs_multi" => {
            require_string_array(map, "log_group_names")?;
            require_string(map, "query")?;
            validate_time_range(map)
        }
        "filter_log_events" => {
            require_string(map, "log_group_name")?;
            require_string(map, "filter_pattern")?;
            validate_time_range(map)
        }
        "summarize_log_activity" | "find_error_patterns" => {
            require_string(map, "log_group_name")?;
            validate_time_range(map)
        }
        // Empty group lists and terms are reported by the correlator itself
        "correlate_logs" => {
            require_string_array(map, "log_group_names")?;
            let term = map
                .get("search_term")
                .ok_or_else(|| anyhow!("search_term is required"))?;
            if !term.is_string() {
                return Err(anyhow!("search_term must be a string"));
            }
            validate_time_range(map)
        }
        _ => Err(anyhow!("Unknown tool: {}", tool_name)),
    }
}

fn require_string(map: &Map<String, Value>, field: &str) -> Result<()> {
    let value = map
        .get(field)
        .ok_or_else(|| anyhow!("{} is required", field))?;

    match value.as_str() {
        Some("") => Err(anyhow!("{} cannot be empty", field)),
        Some(_) => Ok(()),
        None => Err(anyhow!("{} must be a string", field)),
    }
}

fn require_string_array(map: &Map<String, Value>, field: &str) -> Result<()> {
    let value = map
        .get(field)
        .ok_or_else(|| anyhow!("{} is required", field))?;

    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("{} must be an array", field))?;
    for (i, item) in items.iter().enumerate() {
        if !item.is_string() {
            return Err(anyhow!("{}[{}] must be a string, found: {}", field, i, item));
        }
    }
    Ok(())
}

fn optional_string(map: &Map<String, Value>, field: &str) -> Result<()> {
    match map.get(field) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(anyhow!("{} must be a string", field)),
    }
}

fn validate_time_range(map: &Map<String, Value>) -> Result<()> {
    if let Some(hours) = map.get("hours") {
        match hours.as_i64() {
            Some(h) if (1..=MAX_HOURS).contains(&h) => {}
            Some(h) if h < 1 => return Err(anyhow!("hours must be at least 1")),
            Some(_) => return Err(anyhow!("hours must be at most {}", MAX_HOURS)),
            None => return Err(anyhow!("hours must be an integer")),
        }
    }
    optional_string(map, "start_time")?;
    optional_string(map, "end_time")
}

fn validate_list_log_groups(map: &Map<String, Value>) -> Result<()> {
    optional_string(map, "prefix")?;
    optional_string(map, "next_token")?;

    if let Some(limit) = map.get("limit") {
        if let Some(limit_num) = limit.as_i64() {
            if !(1..=50).contains(&limit_num) {
                return Err(anyhow!("limit must be between 1 and 50"));
            }
        } else {
            return Err(anyhow!("limit must be an integer"));
        }
    }
    Ok(())
}
