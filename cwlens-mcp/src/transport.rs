//! Ways of serving a [`CwLensMcpHandler`] to MCP clients.

use std::net::{Ipv4Addr, SocketAddr};

use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::sse_server::SseServer;

use crate::server::CwLensMcpHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// JSON-RPC over stdin/stdout. Nothing else may write to stdout.
    Stdio,
    /// SSE stream on `/sse`, client messages posted to `/message`.
    Sse(SocketAddr),
}

impl Transport {
    /// SSE on every interface.
    pub fn sse_on_port(port: u16) -> Self {
        Transport::Sse(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse(_) => "sse",
        }
    }

    /// Serve until the client disconnects (stdio) or Ctrl-C (SSE).
    pub async fn serve(self, handler: CwLensMcpHandler) -> anyhow::Result<()> {
        match self {
            Transport::Stdio => serve_stdio(handler).await,
            Transport::Sse(addr) => serve_sse(handler, addr).await,
        }
    }
}

async fn serve_stdio(handler: CwLensMcpHandler) -> anyhow::Result<()> {
    let service = serve_server(handler, stdio()).await?;
    service.waiting().await?;
    Ok(())
}

async fn serve_sse(handler: CwLensMcpHandler, addr: SocketAddr) -> anyhow::Result<()> {
    let server = SseServer::serve(addr)
        .await?
        .with_service_directly(move || handler.clone());

    tracing::info!("SSE MCP server listening on {} (SSE /sse, messages /message)", addr);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down SSE MCP server");
    server.cancel();
    Ok(())
}
