//! Conversions between bridge tools and MCP protocol types.

use bridge_core::{Attachment, Tool, ToolResponse};
use rmcp::model::{CallToolResult, Content, JsonObject, Tool as McpTool};
use serde_json::Value;
use std::sync::Arc;

/// MCP definition of a registered tool.
///
/// Input schemas must be JSON objects; anything else is replaced by an
/// empty object schema.
pub fn to_mcp_tool(tool: &dyn Tool) -> McpTool {
    let schema = match tool.schema() {
        Value::Object(map) => map,
        _ => {
            let mut map = JsonObject::new();
            map.insert("type".to_string(), Value::String("object".to_string()));
            map
        }
    };
    McpTool::new(
        tool.name().to_string(),
        tool.description().to_string(),
        Arc::new(schema),
    )
}

/// Map a tool response to an MCP result.
///
/// The envelope becomes a JSON text block, each attachment its own content
/// block, and `is_error` mirrors `success == false`.
pub fn to_call_tool_result(response: ToolResponse) -> CallToolResult {
    let is_success = response.is_success();
    let text = serde_json::to_string_pretty(&response.result)
        .unwrap_or_else(|_| response.result.to_string());

    let mut content = vec![Content::text(text)];
    for attachment in response.attachments {
        match attachment {
            Attachment::Image { data, mime_type } => content.push(Content::image(data, mime_type)),
        }
    }

    if is_success {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    }
}
