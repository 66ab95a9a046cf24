// CWLens CLI - Command-line interface for CloudWatch Logs analysis

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use cwlens_core::prompts::{analyze_logs_prompt, list_log_groups_prompt, ANALYZE_LOGS_PROMPT, LIST_LOG_GROUPS_PROMPT};
use cwlens_core::{AwsSessionProvider, AwsSettings, Config, SessionProvider, TimeRangeArgs, Toolset};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone, ValueEnum, Debug, PartialEq, Eq)]
enum McpTransport {
    Stdio,
    Http,
}

#[derive(Clone, ValueEnum, Debug, PartialEq, Eq)]
enum PromptName {
    ListLogGroups,
    AnalyzeLogs,
}

#[derive(Parser)]
#[command(name = "cwlens")]
#[command(about = "CloudWatch Logs analysis for the terminal and AI assistants", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to CWLENS_CONFIG, ./.cwlens.toml, ~/.config/cwlens/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// AWS profile to use
    #[arg(long, global = true)]
    profile: Option<String>,

    /// AWS region to use
    #[arg(long, global = true)]
    region: Option<String>,

    /// Role to assume before calling CloudWatch Logs
    #[arg(long, global = true)]
    role_arn: Option<String>,

    /// External ID for the role assumption
    #[arg(long, global = true)]
    external_id: Option<String>,

    /// Start MCP server
    #[arg(long)]
    mcp_server: bool,

    /// MCP server port (default: 3001)
    #[arg(long, default_value = "3001")]
    mcp_port: u16,

    /// MCP server transport mode (stdio or http)
    #[arg(long, value_enum, default_value = "stdio")]
    mcp_transport: McpTransport,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct RangeOpts {
    /// Hours to look back from now
    #[arg(long, default_value = "24")]
    hours: i64,

    /// ISO 8601 start time (overrides --hours)
    #[arg(long)]
    start_time: Option<String>,

    /// ISO 8601 end time (defaults to now)
    #[arg(long)]
    end_time: Option<String>,
}

impl RangeOpts {
    fn to_args(&self) -> TimeRangeArgs {
        TimeRangeArgs::hours(self.hours).with_bounds(self.start_time.clone(), self.end_time.clone())
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// List log groups
    ListGroups {
        /// Only groups whose name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Maximum number of groups (1-50)
        #[arg(long)]
        limit: Option<i32>,

        /// Token from a previous page
        #[arg(long)]
        next_token: Option<String>,
    },

    /// Show retention, encryption and size of a log group
    GroupDetails { log_group_name: String },

    /// List the most recently active streams of a log group
    ListStreams { log_group_name: String },

    /// Show the most recent events of a log stream
    GetEvents {
        log_group_name: String,
        log_stream_name: String,
    },

    /// Sample recent events from the newest stream
    Sample { log_group_name: String },

    /// Error events of the last 24 hours
    RecentErrors { log_group_name: String },

    /// Hourly ingested bytes and events over the last day
    Metrics { log_group_name: String },

    /// Detect the log format and common fields
    Structure { log_group_name: String },

    /// Run a Logs Insights query against one log group
    Search {
        log_group_name: String,
        query: String,
        #[command(flatten)]
        range: RangeOpts,
    },

    /// Run a Logs Insights query across several log groups
    SearchMulti {
        /// Log group to include (repeat for each group)
        #[arg(long = "group", required = true)]
        log_group_names: Vec<String>,
        query: String,
        #[command(flatten)]
        range: RangeOpts,
    },

    /// Find events matching a filter pattern
    Filter {
        log_group_name: String,
        filter_pattern: String,
        #[command(flatten)]
        range: RangeOpts,
    },

    /// Summarize event volume, streams and hourly distribution
    Summarize {
        log_group_name: String,
        #[command(flatten)]
        range: RangeOpts,
    },

    /// Find the most frequent error messages
    FindErrors {
        log_group_name: String,
        #[command(flatten)]
        range: RangeOpts,
    },

    /// Correlate events sharing a search term across log groups
    Correlate {
        /// Log group to include (repeat for each group)
        #[arg(long = "group", required = true)]
        log_group_names: Vec<String>,
        search_term: String,
        #[command(flatten)]
        range: RangeOpts,
    },

    /// Render a conversation starter
    Prompt {
        #[arg(value_enum)]
        name: PromptName,

        /// Prefix for the log group listing prompt
        #[arg(long)]
        prefix: Option<String>,

        /// Log group for the analysis prompt
        #[arg(long)]
        log_group_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI args first to check if we're in MCP stdio mode
    let cli = Cli::parse();

    // MCP stdio transport requires pure JSON-RPC on stdout - no logging allowed
    if !cli.mcp_server || cli.mcp_transport != McpTransport::Stdio {
        init_logging();
    }

    let config = load_config(&cli)?;

    if cli.mcp_server {
        if let Err(e) = start_mcp_server(&cli, &config).await {
            error!("Failed to start MCP server: {}", e);
            eprintln!("Failed to start MCP server: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let default_command = Commands::ListGroups {
        prefix: None,
        limit: None,
        next_token: None,
    };
    let command = cli.command.as_ref().unwrap_or(&default_command);

    // Sessions resolve credentials lazily, so prompts never reach AWS
    let toolset = Toolset::new(session_provider(&cli, &config), config.query_settings());
    let response = run_command(&toolset, command).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.get("status").and_then(Value::as_str) == Some("Error") {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["cwlens=info", "cwlens_core=info", "cwlens_mcp=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Responses go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    config.aws = config.aws.overridden_by(&aws_overrides(cli));
    Ok(config)
}

fn aws_overrides(cli: &Cli) -> AwsSettings {
    AwsSettings {
        profile: cli.profile.clone(),
        region: cli.region.clone(),
        role_arn: cli.role_arn.clone(),
        external_id: cli.external_id.clone(),
    }
}

fn session_provider(cli: &Cli, config: &Config) -> Arc<dyn SessionProvider> {
    let provider = AwsSessionProvider::new(config.aws.clone());
    if !cli.mcp_server || cli.mcp_transport != McpTransport::Stdio {
        info!("Using AWS session: {}", provider.describe());
    }
    Arc::new(provider)
}

async fn run_command(toolset: &Toolset, command: &Commands) -> Result<Value> {
    let value = match command {
        Commands::ListGroups { prefix, limit, next_token } => {
            toolset
                .resources
                .list_log_groups(prefix.as_deref(), *limit, next_token.as_deref())
                .await
        }
        Commands::GroupDetails { log_group_name } => {
            toolset.resources.log_group_details(log_group_name).await
        }
        Commands::ListStreams { log_group_name } => toolset.resources.log_streams(log_group_name).await,
        Commands::GetEvents { log_group_name, log_stream_name } => {
            toolset.resources.log_events(log_group_name, log_stream_name).await
        }
        Commands::Sample { log_group_name } => toolset.resources.log_sample(log_group_name).await,
        Commands::RecentErrors { log_group_name } => {
            toolset.resources.recent_errors(log_group_name).await
        }
        Commands::Metrics { log_group_name } => toolset.resources.log_metrics(log_group_name).await,
        Commands::Structure { log_group_name } => {
            toolset.resources.log_structure(log_group_name).await
        }
        Commands::Search { log_group_name, query, range } => {
            toolset
                .search
                .search_logs(log_group_name, query, &range.to_args())
                .await
        }
        Commands::SearchMulti { log_group_names, query, range } => {
            toolset
                .search
                .search_logs_multi(log_group_names, query, &range.to_args())
                .await
        }
        Commands::Filter { log_group_name, filter_pattern, range } => {
            toolset
                .search
                .filter_log_events(log_group_name, filter_pattern, &range.to_args())
                .await
        }
        Commands::Summarize { log_group_name, range } => {
            toolset
                .analysis
                .summarize_log_activity(log_group_name, &range.to_args())
                .await
        }
        Commands::FindErrors { log_group_name, range } => {
            toolset
                .analysis
                .find_error_patterns(log_group_name, &range.to_args())
                .await
        }
        Commands::Correlate { log_group_names, search_term, range } => {
            toolset
                .correlation
                .correlate_logs(log_group_names, search_term, &range.to_args())
                .await
        }
        Commands::Prompt { name, prefix, log_group_name } => {
            render_prompt(name, prefix.as_deref(), log_group_name.as_deref())?
        }
    };

    Ok(value)
}

fn render_prompt(name: &PromptName, prefix: Option<&str>, log_group_name: Option<&str>) -> Result<Value> {
    let (prompt, text) = match name {
        PromptName::ListLogGroups => (LIST_LOG_GROUPS_PROMPT, list_log_groups_prompt(prefix)),
        PromptName::AnalyzeLogs => {
            let group = log_group_name
                .filter(|g| !g.is_empty())
                .ok_or_else(|| anyhow::anyhow!("--log-group-name is required for the analyze-logs prompt"))?;
            (ANALYZE_LOGS_PROMPT, analyze_logs_prompt(group))
        }
    };

    Ok(json!({ "name": prompt, "text": text }))
}

/// Start the MCP server
async fn start_mcp_server(cli: &Cli, config: &Config) -> Result<()> {
    use cwlens_mcp::{create_server, Config as McpConfig};

    let session = session_provider(cli, config);
    let server = create_server(session, config.query_settings(), McpConfig::from_core(config)).await?;

    // Start server with appropriate transport
    match cli.mcp_transport {
        McpTransport::Stdio => server.start_stdio().await?,
        McpTransport::Http => {
            info!("Starting MCP server with HTTP transport on port {}", cli.mcp_port);
            eprintln!("Starting CWLens MCP server on port {}", cli.mcp_port);
            eprintln!("   Press Ctrl+C to stop");
            server.start_http(cli.mcp_port).await?
        }
    }

    Ok(())
}
