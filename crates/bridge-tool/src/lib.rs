//! Tool system for OpenBridge
//!
//! This crate provides the tool execution framework, including:
//! - Function tools with a builder and typed parameter parsing
//! - JSON schema helpers for tool inputs
//! - Tool context management
//! - The registry that holds every tool for the lifetime of the process

pub mod context;
pub mod function_tool;
pub mod registry;
pub mod schema;

// Re-exports
pub use context::DefaultToolContext;
pub use function_tool::{FunctionTool, parse_params};
pub use registry::ToolRegistry;
pub use schema::generate_schema;

// Re-export core types
pub use bridge_core::{Result, Tool, ToolContext, ToolOutcome, ToolResponse};
