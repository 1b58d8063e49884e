//! Decides which document operations become tools.

use crate::types::{HttpMethod, Operation};
use bridge_core::BridgeConfig;
use std::fmt;
use tracing::info;

/// Response content types that cannot be represented as a JSON tool result.
const BINARY_CONTENT_PREFIXES: [&str; 3] = ["image/", "application/octet-stream", "application/pdf"];

/// Why an operation was not exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedMethod(String),
    ExcludedPattern(String),
    BinaryResponse(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedMethod(method) => write!(f, "unsupported method: {}", method),
            SkipReason::ExcludedPattern(pattern) => write!(f, "matched pattern: {}", pattern),
            SkipReason::BinaryResponse(mime) => write!(f, "mime type: {}", mime),
        }
    }
}

/// Denylist-based eligibility rules for operations.
#[derive(Debug, Clone)]
pub struct EndpointFilter {
    excluded_patterns: Vec<String>,
    binary_download_marker: String,
}

impl Default for EndpointFilter {
    fn default() -> Self {
        Self::new(vec!["stream".into(), "webpage".into()], "download-image")
    }
}

impl EndpointFilter {
    /// Patterns are matched case-insensitively as plain substrings.
    pub fn new(excluded_patterns: Vec<String>, binary_download_marker: impl Into<String>) -> Self {
        Self {
            excluded_patterns: excluded_patterns
                .into_iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            binary_download_marker: binary_download_marker.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.excluded_endpoint_patterns.clone(),
            config.binary_download_marker.clone(),
        )
    }

    /// Apply the rules in order; the first rule that rejects wins.
    pub fn evaluate(
        &self,
        path: &str,
        method: &str,
        operation: &Operation,
    ) -> Result<HttpMethod, SkipReason> {
        let http_method = HttpMethod::parse(method)
            .ok_or_else(|| SkipReason::UnsupportedMethod(method.to_uppercase()))?;

        let lowered = path.to_lowercase();
        if let Some(pattern) = self
            .excluded_patterns
            .iter()
            .find(|p| lowered.contains(p.as_str()))
        {
            return Err(SkipReason::ExcludedPattern(pattern.clone()));
        }

        let is_download = !self.binary_download_marker.is_empty()
            && path.contains(&self.binary_download_marker);
        if !is_download {
            if let Some(mime) = operation.response_content_types.iter().find(|mime| {
                let mime = mime.to_ascii_lowercase();
                BINARY_CONTENT_PREFIXES.iter().any(|p| mime.starts_with(p))
            }) {
                return Err(SkipReason::BinaryResponse(mime.clone()));
            }
        }

        Ok(http_method)
    }

    /// [`evaluate`](Self::evaluate), logging the reason on rejection.
    ///
    /// `Some(method)` when the operation should become a tool.
    pub fn eligible(&self, path: &str, method: &str, operation: &Operation) -> Option<HttpMethod> {
        match self.evaluate(path, method, operation) {
            Ok(http_method) => Some(http_method),
            Err(reason) => {
                info!(
                    "Skipping endpoint: {} {} ({})",
                    method.to_uppercase(),
                    path,
                    reason
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_with(types: &[&str]) -> Operation {
        Operation {
            response_content_types: types.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unsupported_methods_rejected_first() {
        let filter = EndpointFilter::default();
        let op = op_with(&[]);
        assert_eq!(
            filter.evaluate("/stream", "head", &op),
            Err(SkipReason::UnsupportedMethod("HEAD".into()))
        );
        assert!(filter.eligible("/cards", "options", &op).is_none());
        assert!(filter.eligible("/cards", "trace", &op).is_none());
        assert_eq!(filter.evaluate("/cards", "PATCH", &op), Ok(HttpMethod::Patch));
    }

    #[test]
    fn test_excluded_patterns_any_case_any_method() {
        let filter = EndpointFilter::default();
        let op = op_with(&["application/json"]);
        for method in ["get", "post", "put", "delete", "patch"] {
            assert!(filter.eligible("/cards/STREAM", method, &op).is_none());
            assert!(filter.eligible("/Webpage/view", method, &op).is_none());
            assert!(filter.eligible("/live-stream/download-image", method, &op).is_none());
        }
        assert!(filter.eligible("/cards", "get", &op).is_some());
    }

    #[test]
    fn test_binary_responses_need_marker() {
        let filter = EndpointFilter::default();
        let png = op_with(&["application/json", "image/png"]);
        assert_eq!(
            filter.evaluate("/cards/{id}/image", "get", &png),
            Err(SkipReason::BinaryResponse("image/png".into()))
        );
        assert!(filter.eligible("/cards/{id}/download-image", "get", &png).is_some());

        assert!(filter.eligible("/report", "get", &op_with(&["application/pdf"])).is_none());
        assert!(
            filter
                .eligible("/blob", "get", &op_with(&["application/octet-stream"]))
                .is_none()
        );
        assert!(filter.eligible("/text", "get", &op_with(&["text/plain"])).is_some());
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let filter = EndpointFilter::default();
        let png = op_with(&["image/png"]);
        assert!(filter.eligible("/cards/{id}/Download-Image", "get", &png).is_none());
    }

    #[test]
    fn test_custom_patterns() {
        let filter = EndpointFilter::new(vec!["Admin".into(), String::new()], "fetch-file");
        let op = op_with(&["image/jpeg"]);
        assert!(filter.eligible("/admin/users", "get", &op_with(&[])).is_none());
        assert!(filter.eligible("/stream", "get", &op_with(&[])).is_some());
        assert!(filter.eligible("/files/fetch-file", "get", &op).is_some());
    }
}
