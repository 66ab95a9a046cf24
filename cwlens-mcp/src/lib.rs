use std::sync::Arc;

use cwlens_core::{QuerySettings, SessionProvider, Toolset};

pub mod prompts;
pub mod resources;
pub mod schema;
pub mod server;
pub mod tools;
pub mod transport;
pub mod validation;

/// Configuration for MCP server
#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "cwlens-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    pub fn from_core(config: &cwlens_core::Config) -> Self {
        Self {
            server_name: config.server_name(),
            ..Self::default()
        }
    }
}

/// Factory function to create MCP server
pub async fn create_server(
    session: Arc<dyn SessionProvider>,
    settings: QuerySettings,
    config: Config,
) -> anyhow::Result<McpServer> {
    Ok(McpServer::new(Toolset::new(session, settings), config))
}

// Re-export the server struct
pub use server::{CwLensMcpHandler, McpServer};
