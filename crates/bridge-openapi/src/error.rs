//! Error types for OpenAPI tool generation.

use thiserror::Error;

/// Result type for OpenAPI operations.
pub type Result<T> = std::result::Result<T, OpenApiError>;

/// Errors that can occur while loading a document and building tools.
///
/// Failures during a tool invocation are never surfaced through this type;
/// they are reported to the caller as a `ToolOutcome`.
#[derive(Error, Debug)]
pub enum OpenApiError {
    /// OpenAPI document parsing error
    #[error("Failed to parse OpenAPI document: {0}")]
    ParseError(String),

    /// Document parsed but is not shaped like an OpenAPI description
    #[error("Invalid OpenAPI document: {0}")]
    InvalidSpec(String),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}
