use rmcp::{
    ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ResourceContents,
        ServerInfo,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::Value;
use std::sync::Arc;
use cwlens_core::Toolset;
use crate::Config;
use crate::resources::{resource_list, resource_templates, ResourceRoute};
use crate::transport::Transport;

/// Main MCP server structure
#[derive(Clone)]
pub struct McpServer {
    pub toolset: Toolset,
    pub config: Config,
}

impl McpServer {
    /// Create new MCP server instance
    pub fn new(toolset: Toolset, config: Config) -> Self {
        Self { toolset, config }
    }

    pub fn toolset(&self) -> &Toolset {
        &self.toolset
    }

    /// Get config reference
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// MCP Server Handler implementing the RMCP ServerHandler trait
#[derive(Clone)]
pub struct CwLensMcpHandler {
    pub server: Arc<McpServer>,
}

fn is_error_envelope(value: &Value) -> bool {
    value.get("status").and_then(Value::as_str) == Some("Error")
}

impl CwLensMcpHandler {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Run a tool and wrap its JSON response as a single text content.
    pub async fn run_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Map<String, Value>,
    ) -> Result<CallToolResult, rmcp::Error> {
        let arguments_value = Value::Object(arguments);

        // Validate input parameters
        if let Err(e) = crate::validation::validate_tool_params(tool_name, &arguments_value) {
            if !crate::tools::TOOL_NAMES.contains(&tool_name) {
                return Err(rmcp::Error::invalid_request(format!("Unknown tool: {}", tool_name), None));
            }
            let envelope = cwlens_core::tools::error_envelope(
                &cwlens_core::CwLensError::invalid_input(format!("Validation error: {}", e)),
            );
            return Self::text_result(&envelope);
        }

        let value = crate::tools::call(self.server.toolset(), tool_name, arguments_value)
            .await
            .ok_or_else(|| rmcp::Error::invalid_request(format!("Unknown tool: {}", tool_name), None))?;

        Self::text_result(&value)
    }

    fn text_result(value: &Value) -> Result<CallToolResult, rmcp::Error> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| rmcp::Error::internal_error(format!("Failed to serialize result: {}", e), None))?;

        Ok(CallToolResult {
            content: vec![Content::text(text)],
            is_error: is_error_envelope(value).then_some(true),
        })
    }

    /// Resolve a `logs://` URI to its JSON body.
    pub async fn read_uri(&self, uri: &str) -> Result<Value, rmcp::Error> {
        let route = ResourceRoute::parse(uri).ok_or_else(|| {
            rmcp::Error::resource_not_found(format!("Unknown resource: {}", uri), None)
        })?;
        Ok(route.read(&self.server.toolset().resources).await)
    }
}

impl ServerHandler for CwLensMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("CloudWatch Logs analysis for AI assistants. Browse log groups and streams, run Logs Insights queries, summarize activity, find error patterns and correlate events across log groups.".into()),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::Error> {
        Ok(ListToolsResult {
            tools: crate::tools::tool_definitions(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::Error> {
        let arguments = request.arguments.unwrap_or_default();
        self.run_tool(request.name.as_ref(), arguments).await
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, rmcp::Error> {
        Ok(ListResourcesResult {
            resources: resource_list(),
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, rmcp::Error> {
        Ok(ListResourceTemplatesResult {
            resource_templates: resource_templates(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, rmcp::Error> {
        let value = self.read_uri(&request.uri).await?;
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| rmcp::Error::internal_error(format!("Failed to serialize resource: {}", e), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, rmcp::Error> {
        Ok(ListPromptsResult {
            prompts: crate::prompts::prompt_definitions(),
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, rmcp::Error> {
        crate::prompts::render_prompt(&request.name, request.arguments.as_ref())
    }
}

impl McpServer {
    /// Create a handler for this server
    pub fn create_handler(&self) -> CwLensMcpHandler {
        CwLensMcpHandler::new(Arc::new(self.clone()))
    }

    /// Serve over stdin/stdout. Logs must already be routed away from stdout.
    pub async fn start_stdio(&self) -> anyhow::Result<()> {
        Transport::Stdio.serve(self.create_handler()).await
    }

    /// Serve over SSE on `port`.
    pub async fn start_http(&self, port: u16) -> anyhow::Result<()> {
        let transport = Transport::sse_on_port(port);
        tracing::info!(
            "Starting {} {} with {} transport on port {}",
            self.config.server_name,
            self.config.server_version,
            transport.name(),
            port
        );
        tracing::info!("Available tools: {}", crate::tools::TOOL_NAMES.join(", "));

        transport.serve(self.create_handler()).await
    }
}
