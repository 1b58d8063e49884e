//! MCP (Model Context Protocol) server for OpenBridge
//!
//! Exposes every tool in a `ToolRegistry` to an assistant runtime using the
//! official rmcp Rust SDK. Only the stdio transport is provided.

pub mod convert;
pub mod server;

// Re-exports
pub use convert::{to_call_tool_result, to_mcp_tool};
pub use server::BridgeMcpServer;
