use crate::Result;
use crate::outcome::ToolOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-invocation context handed to a tool.
pub trait ToolContext: Send + Sync {
    fn function_call_id(&self) -> &str;
    fn invocation_id(&self) -> &str;
}

/// Binary payload returned next to the JSON result of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// Inline image, base64 encoded
    Image { data: String, mime_type: String },
}

/// Response from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ToolResponse {
    pub fn new(result: serde_json::Value) -> Self {
        Self {
            result,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Whether the result envelope reports success.
    ///
    /// Results without a `success` field count as successful.
    pub fn is_success(&self) -> bool {
        self.result
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }
}

impl From<ToolOutcome> for ToolResponse {
    fn from(outcome: ToolOutcome) -> Self {
        ToolResponse::new(outcome.into_value())
    }
}

/// A named, described, callable unit exposed to the assistant runtime.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool
    fn name(&self) -> &str;

    /// Returns a description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's parameters
    fn schema(&self) -> serde_json::Value;

    /// Executes the tool with given parameters
    async fn execute(
        &self,
        ctx: Arc<dyn ToolContext>,
        params: serde_json::Value,
    ) -> Result<ToolResponse>;
}
