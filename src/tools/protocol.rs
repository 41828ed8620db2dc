//! MCP tool server for one service, served over stdio.

use std::io;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;

use crate::tools::registry::ToolRegistry;

pub struct ToolServer {
    name: String,
    registry: ToolRegistry,
}

impl ToolServer {
    pub fn new(name: impl Into<String>, registry: ToolRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn list(&self) -> ListToolsResult {
        ListToolsResult::with_all_items(self.registry.tools())
    }

    /// Run one tool. Unknown names are a protocol error; everything else is
    /// reported inside the result.
    pub async fn handle_call(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = %name, "Tool call");
        self.registry
            .call(name, arguments)
            .await
            .ok_or_else(|| McpError::invalid_params(format!("Unknown tool: {name}"), None))
    }

    /// Serve on stdin/stdout until the client disconnects.
    pub async fn run_stdio(self) -> io::Result<()> {
        let server_name = self.name.clone();
        let running = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|e| io::Error::other(e.to_string()))?;
        let reason = running.waiting().await.map_err(io::Error::other)?;
        tracing::info!(server = %server_name, reason = ?reason, "Tool server stopped");
        Ok(())
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(self.list())
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        self.handle_call(&request.name, arguments).await
    }
}
