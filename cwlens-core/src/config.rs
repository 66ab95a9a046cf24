use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::Result;
use tracing::warn;

/// Hard ceiling on how long a query is polled before giving up.
pub const MAX_QUERY_TIMEOUT_SECS: u64 = 60;

/// Shortest wait between two status polls.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsSettings,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where credentials come from. Unset values fall through to the default AWS chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSettings {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub role_arn: Option<String>,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    pub poll_interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub default_limit: Option<i32>,
    pub concurrent_correlation: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Option<String>,
}

/// Resolved polling parameters handed to the query executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub default_limit: i32,
    pub concurrent_correlation: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(MAX_QUERY_TIMEOUT_SECS),
            default_limit: 100,
            concurrent_correlation: false,
        }
    }
}

impl QuerySettings {
    /// Timeouts above the ceiling are clamped to it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.min(Duration::from_secs(MAX_QUERY_TIMEOUT_SECS));
        self
    }

    /// Intervals are kept between one second and the timeout ceiling.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.clamp(
            Duration::from_secs(MIN_POLL_INTERVAL_SECS),
            Duration::from_secs(MAX_QUERY_TIMEOUT_SECS),
        );
        self
    }

    pub fn with_concurrent_correlation(mut self, concurrent: bool) -> Self {
        self.concurrent_correlation = concurrent;
        self
    }
}

impl AwsSettings {
    /// Values set in `other` win.
    pub fn overridden_by(&self, other: &AwsSettings) -> AwsSettings {
        AwsSettings {
            profile: other.profile.clone().or_else(|| self.profile.clone()),
            region: other.region.clone().or_else(|| self.region.clone()),
            role_arn: other.role_arn.clone().or_else(|| self.role_arn.clone()),
            external_id: other.external_id.clone().or_else(|| self.external_id.clone()),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::get_config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Config::default()),
        }
    }

    /// Missing or unparsable files yield the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        match toml::from_str::<Config>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Ignoring unparsable config {}: {}", path.display(), e);
                Ok(Config::default())
            }
        }
    }

    pub fn query_settings(&self) -> QuerySettings {
        let defaults = QuerySettings::default();
        let poll_interval = self
            .query
            .poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);
        let timeout = self
            .query
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        QuerySettings {
            default_limit: self.query.default_limit.unwrap_or(defaults.default_limit),
            ..defaults
        }
        .with_poll_interval(poll_interval)
        .with_timeout(timeout)
        .with_concurrent_correlation(self.query.concurrent_correlation.unwrap_or(false))
    }

    pub fn server_name(&self) -> String {
        self.server
            .name
            .clone()
            .unwrap_or_else(|| "cwlens-mcp".to_string())
    }

    fn get_config_path() -> Option<PathBuf> {
        // Explicit override first
        if let Ok(path) = env::var("CWLENS_CONFIG") {
            return Some(PathBuf::from(path));
        }

        // Then project-level config
        if let Ok(current_dir) = env::current_dir() {
            let project_config = current_dir.join(".cwlens.toml");
            if project_config.exists() {
                return Some(project_config);
            }
        }

        // Then user-level config
        if let Some(home_dir) = dirs::home_dir() {
            let user_config = home_dir.join(".config").join("cwlens").join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}
