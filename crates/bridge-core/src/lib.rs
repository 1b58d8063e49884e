//! Core traits and types for OpenBridge
//!
//! This crate provides the foundational abstractions shared by every tool
//! crate: the `Tool` trait, the result envelope returned across the tool
//! boundary, the error type and the process configuration.

pub mod config;
pub mod error;
pub mod outcome;
pub mod traits;

// Re-exports
pub use config::{BridgeConfig, LoggingConfig};
pub use error::{Error, Result};
pub use outcome::ToolOutcome;
pub use traits::{Attachment, Tool, ToolContext, ToolResponse};
