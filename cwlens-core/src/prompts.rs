//! Conversation starters offered to the assistant.

pub const LIST_LOG_GROUPS_PROMPT: &str = "list_cloudwatch_log_groups";
pub const ANALYZE_LOGS_PROMPT: &str = "analyze_cloudwatch_logs";

pub fn list_log_groups_prompt(prefix: Option<&str>) -> String {
    let scope = match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!(" starting with '{}'", prefix),
        None => String::new(),
    };

    format!(
        "I'll help you explore the CloudWatch log groups{scope} in your AWS environment.

I'll start by listing the available log groups. For any of them I can:

1. Inspect the structure and format of its logs
2. Look for recent errors and recurring patterns
3. Report volume and activity metrics
4. Pull a sample of recent events
5. Search for specific events or identifiers

Tell me which log group you want to dig into, or give me a different prefix to narrow the list.
"
    )
}

pub fn analyze_logs_prompt(log_group_name: &str) -> String {
    format!(
        "Please analyze the CloudWatch logs in the {log_group_name} log group.

To build context, first gather:
1. The log structure, to understand the message format
2. Recent errors
3. Volume metrics for the last day
4. A sample of recent events

From that, please:
- Identify recurring errors or exceptions
- Point out unusual patterns or anomalies
- Suggest likely root causes for any problems
- Recommend steps to resolve or mitigate them
- Note anything relevant to performance or resource usage

Ask for more context when it would help, for example correlated logs from other
services, a narrower time range, or targeted queries for specific messages.
"
    )
}
