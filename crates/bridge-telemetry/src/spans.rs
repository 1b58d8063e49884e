//! Span creation helpers for tool executions

use crate::attributes::*;

/// Attributes for tracing a tool call
#[derive(Debug, Clone)]
pub struct ToolSpanAttributes {
    pub tool_name: String,
    pub tool_call_id: String,
    pub invocation_id: String,
    pub args_json: String,
    pub success: bool,
    pub duration_ms: u64,
}

/// Create and record a span for a tool execution.
///
/// Records the tool name, call ID, arguments, outcome and duration so each
/// invocation from the assistant runtime can be followed in the logs or an
/// OpenTelemetry backend.
pub fn trace_tool_call(attrs: ToolSpanAttributes) {
    let span = tracing::info_span!(
        "execute_tool",
        { GEN_AI_OPERATION_NAME } = "execute_tool",
        { GEN_AI_SYSTEM } = SYSTEM_NAME,
        { GEN_AI_TOOL_NAME } = %attrs.tool_name,
        { GEN_AI_TOOL_CALL_ID } = %attrs.tool_call_id,
        { BRIDGE_INVOCATION_ID } = %attrs.invocation_id,
        { BRIDGE_TOOL_CALL_ARGS } = %attrs.args_json,
        { BRIDGE_TOOL_SUCCESS } = attrs.success,
        { BRIDGE_TOOL_DURATION_MS } = attrs.duration_ms,
    );

    // Enter and immediately exit the span (it's recorded)
    let _guard = span.enter();
}

/// Helper to safely serialize to JSON string
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}
