use cwlens_core::prompts::{
    analyze_logs_prompt, list_log_groups_prompt, ANALYZE_LOGS_PROMPT, LIST_LOG_GROUPS_PROMPT,
};
use rmcp::model::{
    GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageRole,
};

pub fn prompt_definitions() -> Vec<Prompt> {
    vec![
        Prompt::new(
            LIST_LOG_GROUPS_PROMPT,
            Some("Explore the CloudWatch log groups of the account"),
            Some(vec![PromptArgument {
                name: "prefix".to_string(),
                description: Some("Optional prefix to filter log groups by name".to_string()),
                required: Some(false),
            }]),
        ),
        Prompt::new(
            ANALYZE_LOGS_PROMPT,
            Some("Analyze a log group for errors, patterns and anomalies"),
            Some(vec![PromptArgument {
                name: "log_group_name".to_string(),
                description: Some("The log group to analyze".to_string()),
                required: Some(true),
            }]),
        ),
    ]
}

fn string_argument<'a>(arguments: Option<&'a JsonObject>, name: &str) -> Option<&'a str> {
    arguments
        .and_then(|args| args.get(name))
        .and_then(|value| value.as_str())
}

/// Render a prompt. Unknown prompts and missing required arguments are protocol errors.
pub fn render_prompt(name: &str, arguments: Option<&JsonObject>) -> Result<GetPromptResult, rmcp::Error> {
    let (description, text) = match name {
        LIST_LOG_GROUPS_PROMPT => (
            "Explore the CloudWatch log groups of the account",
            list_log_groups_prompt(string_argument(arguments, "prefix")),
        ),
        ANALYZE_LOGS_PROMPT => {
            let group = string_argument(arguments, "log_group_name")
                .filter(|g| !g.is_empty())
                .ok_or_else(|| {
                    rmcp::Error::invalid_params("log_group_name is required", None)
                })?;
            (
                "Analyze a log group for errors, patterns and anomalies",
                analyze_logs_prompt(group),
            )
        }
        _ => {
            return Err(rmcp::Error::invalid_params(
                format!("Unknown prompt: {}", name),
                None,
            ))
        }
    };

    Ok(GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definitions() {
        let names: Vec<_> = prompt_definitions().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec![LIST_LOG_GROUPS_PROMPT, ANALYZE_LOGS_PROMPT]);
    }

    #[test]
    fn test_analyze_requires_group() {
        assert!(render_prompt(ANALYZE_LOGS_PROMPT, None).is_err());

        let args = json!({"log_group_name": "/ecs/web"});
        let rendered = render_prompt(ANALYZE_LOGS_PROMPT, args.as_object()).unwrap();
        assert_eq!(rendered.messages.len(), 1);
    }

    #[test]
    fn test_list_prompt_without_arguments() {
        assert!(render_prompt(LIST_LOG_GROUPS_PROMPT, None).is_ok());
        assert!(render_prompt("nope", None).is_err());
    }
}
