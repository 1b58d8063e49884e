//! # OpenBridge Telemetry
//!
//! Logging and tracing setup for the bridge process, plus span helpers for
//! tool invocations.
//!
//! The MCP stdio transport owns stdout, so log output always goes to stderr
//! or to the configured log file.

mod spans;
mod tracer;

pub use spans::{ToolSpanAttributes, safe_serialize, trace_tool_call};
pub use tracer::{flush_telemetry, init_telemetry, register_span_processor};

/// Span attribute names for tool observability.
///
/// These follow the OpenTelemetry semantic conventions for generative AI
/// tool execution.
pub mod attributes {
    pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
    pub const GEN_AI_SYSTEM: &str = "gen_ai.system";

    // Tool-specific attributes
    pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";
    pub const GEN_AI_TOOL_CALL_ID: &str = "gen_ai.tool.call.id";

    // Bridge attributes
    pub const BRIDGE_TOOL_CALL_ARGS: &str = "openbridge.tool_call_args";
    pub const BRIDGE_TOOL_SUCCESS: &str = "openbridge.tool_success";
    pub const BRIDGE_TOOL_DURATION_MS: &str = "openbridge.tool_duration_ms";
    pub const BRIDGE_INVOCATION_ID: &str = "openbridge.invocation_id";

    // System name constant
    pub const SYSTEM_NAME: &str = "openbridge";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_constants() {
        assert_eq!(attributes::GEN_AI_OPERATION_NAME, "gen_ai.operation.name");
        assert_eq!(attributes::GEN_AI_TOOL_NAME, "gen_ai.tool.name");
        assert_eq!(attributes::SYSTEM_NAME, "openbridge");
    }
}
