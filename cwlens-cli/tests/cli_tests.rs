// CLI Tests
// Run the cwlens binary for commands that never reach AWS

use std::io::Write;
use std::process::{Command, Output};

fn cwlens(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cwlens"))
        .args(args)
        .env_remove("CWLENS_CONFIG")
        .output()
        .expect("Failed to run cwlens")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_help_lists_subcommands() {
    let output = cwlens(&["--help"]);
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["list-groups", "search-multi", "correlate", "prompt"] {
        assert!(help.contains(command), "help should mention {}", command);
    }
}

#[test]
fn test_analyze_prompt_renders_json() {
    let output = cwlens(&["prompt", "analyze-logs", "--log-group-name", "/aws/lambda/orders"]);
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["name"], "analyze_cloudwatch_logs");
    assert!(value["text"].as_str().unwrap().contains("/aws/lambda/orders"));
}

#[test]
fn test_analyze_prompt_requires_group() {
    let output = cwlens(&["prompt", "analyze-logs"]);
    assert!(!output.status.success());
}

#[test]
fn test_prompt_with_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[aws]\nregion = \"eu-west-1\"\n\n[server]\nname = \"logs-test\"").unwrap();

    let path = file.path().to_string_lossy().to_string();
    let output = cwlens(&["--config", &path, "prompt", "list-log-groups", "--prefix", "/ecs"]);
    assert!(output.status.success());

    let value = stdout_json(&output);
    assert_eq!(value["name"], "list_cloudwatch_log_groups");
    assert!(value["text"].as_str().unwrap().contains("starting with '/ecs'"));
}

#[test]
fn test_unknown_transport_is_rejected() {
    let output = cwlens(&["--mcp-server", "--mcp-transport", "websocket"]);
    assert!(!output.status.success());
}
