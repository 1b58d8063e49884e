//! The result envelope every tool returns to the assistant runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized result of a tool invocation.
///
/// Failures of any origin (upstream HTTP status, timeout, bad caller input,
/// internal error) are reported through the same shape so the runtime
/// always sees a consistent contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    /// Empty on success
    #[serde(default)]
    pub error: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ToolOutcome {
    pub fn success(data: Value, description: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            error: String::new(),
            description: description.into(),
            status_code: None,
            content_type: None,
            path: None,
            filename: None,
        }
    }

    pub fn failure(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Object(Map::new()),
            error: error.into(),
            description: description.into(),
            status_code: None,
            content_type: None,
            path: None,
            filename: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn into_value(self) -> Value {
        // A plain struct of strings, numbers and JSON values always serializes.
        serde_json::to_value(&self).unwrap_or_else(|e| {
            serde_json::json!({
                "success": false,
                "data": {},
                "error": e.to_string(),
                "description": "Failed to serialize tool result",
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_shape() {
        let value = ToolOutcome::failure("Request timed out", "timed out after 30 seconds")
            .with_status(408)
            .into_value();

        assert_eq!(value["success"], false);
        assert_eq!(value["status_code"], 408);
        assert_eq!(value["data"], json!({}));
        assert_eq!(value["error"], "Request timed out");
        assert!(value.get("path").is_none());
    }

    #[test]
    fn test_success_has_empty_error() {
        let value = ToolOutcome::success(json!({"id": 1}), "ok").into_value();
        assert_eq!(value["success"], true);
        assert_eq!(value["error"], "");
        assert!(value.get("status_code").is_none());
    }

    #[test]
    fn test_round_trip_keeps_binary_fields() {
        let outcome = ToolOutcome::success(json!("/tmp/a.png"), "saved")
            .with_path("/tmp/a.png")
            .with_filename("a.png")
            .with_content_type("image/png");
        let parsed: ToolOutcome = serde_json::from_value(outcome.clone().into_value()).unwrap();
        assert_eq!(parsed, outcome);
    }
}
