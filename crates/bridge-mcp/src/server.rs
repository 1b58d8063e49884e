//! MCP server exposing the tool registry.

use crate::convert::{to_call_tool_result, to_mcp_tool};
use anyhow::Context;
use bridge_core::{ToolContext, ToolOutcome, ToolResponse};
use bridge_telemetry::{ToolSpanAttributes, safe_serialize, trace_tool_call};
use bridge_tool::{DefaultToolContext, ToolRegistry};
use futures::FutureExt;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ErrorData as McpError, Implementation, JsonObject,
    ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Serves every tool of a [`ToolRegistry`] over MCP.
#[derive(Clone)]
pub struct BridgeMcpServer {
    name: String,
    instructions: Option<String>,
    registry: Arc<ToolRegistry>,
    /// Identifies this server session in tool spans
    session_id: String,
}

impl BridgeMcpServer {
    pub fn new(name: impl Into<String>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            registry,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// MCP definitions of all registered tools, in registration order.
    pub fn tool_definitions(&self) -> Vec<McpTool> {
        self.registry
            .tools()
            .iter()
            .map(|tool| to_mcp_tool(tool.as_ref()))
            .collect()
    }

    /// Run one tool call.
    ///
    /// Always yields a response: unknown tools, tool errors and panics are
    /// all turned into failure envelopes.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> ToolResponse {
        let Some(tool) = self.registry.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return ToolOutcome::failure(
                "Unknown tool",
                format!("No tool named '{}' is registered.", name),
            )
            .into();
        };

        let params = Value::Object(arguments.unwrap_or_default());
        let call_id = Uuid::new_v4().to_string();
        let ctx: Arc<dyn ToolContext> =
            Arc::new(DefaultToolContext::new(call_id.clone(), self.session_id.clone()));
        let args_json = safe_serialize(&params);
        debug!(tool = %name, call_id = %call_id, "Dispatching tool call");

        let started = Instant::now();
        let outcome = AssertUnwindSafe(tool.execute(ctx, params))
            .catch_unwind()
            .await;
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(tool = %name, error = %e, "Tool execution failed");
                ToolOutcome::failure(
                    e.to_string(),
                    format!("Tool '{}' failed due to an internal error.", name),
                )
                .into()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = %name, panic = %message, "Tool panicked");
                ToolOutcome::failure(
                    message,
                    format!("Tool '{}' failed due to an internal error.", name),
                )
                .into()
            }
        };

        trace_tool_call(ToolSpanAttributes {
            tool_name: name.to_string(),
            tool_call_id: call_id,
            invocation_id: self.session_id.clone(),
            args_json,
            success: response.is_success(),
            duration_ms: started.elapsed().as_millis() as u64,
        });

        response
    }

    /// Serve on stdin/stdout until the client disconnects.
    pub async fn serve_stdio(self) -> anyhow::Result<()> {
        info!(
            "Serving {} tools as '{}' over stdio",
            self.registry.len(),
            self.name
        );
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .context("Failed to start MCP server on stdio")?;
        let reason = service.waiting().await?;
        info!("MCP session ended: {:?}", reason);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool panicked".to_string())
}

impl ServerHandler for BridgeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: self.instructions.clone(),
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let response = self.dispatch(request.name.as_ref(), request.arguments).await;
        Ok(to_call_tool_result(response))
    }
}

impl std::fmt::Debug for BridgeMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeMcpServer")
            .field("name", &self.name)
            .field("tools", &self.registry.tool_names())
            .finish()
    }
}
