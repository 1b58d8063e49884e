//! Intermediate representation of the operations read from an OpenAPI document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HTTP methods that may be exposed as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Parse a method name, ignoring case. Unsupported methods yield `None`.
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Arguments travel in the query string for GET and as a JSON body otherwise.
    pub fn sends_query(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

/// Location where a parameter appears in the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path parameter (e.g., /cards/{id})
    Path,
    /// Query parameter (e.g., ?verbose=true)
    Query,
    /// Header parameter
    Header,
    /// Cookie parameter
    Cookie,
    /// Request body parameter
    Body,
}

impl ParameterLocation {
    /// Map the OpenAPI `in` field; unknown values are treated as query.
    pub fn from_openapi(location: &str) -> Self {
        match location.to_ascii_lowercase().as_str() {
            "path" => ParameterLocation::Path,
            "header" => ParameterLocation::Header,
            "cookie" => ParameterLocation::Cookie,
            "body" | "formdata" => ParameterLocation::Body,
            _ => ParameterLocation::Query,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
            ParameterLocation::Body => write!(f, "body"),
        }
    }
}

/// Represents a parameter in an API operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiParameter {
    /// Name as declared in the document
    pub name: String,
    /// Location of the parameter
    pub location: ParameterLocation,
    /// Whether the parameter is required
    pub required: bool,
    /// JSON schema for the parameter
    pub schema: Value,
    /// Description of the parameter
    pub description: Option<String>,
}

/// One operation as read from the document, before eligibility is decided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    pub summary: String,
    pub description: String,
    pub operation_id: Option<String>,
    /// Path-level and operation-level parameters, references resolved
    pub parameters: Vec<ApiParameter>,
    /// Every content type declared by any response
    pub response_content_types: Vec<String>,
    /// Schema of the JSON request body, when declared
    pub request_body_schema: Option<Value>,
}

impl Operation {
    pub fn path_parameters(&self) -> impl Iterator<Item = &ApiParameter> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }
}

/// A (path, method) pair and its operation, as found in the document.
///
/// `method` keeps the spelling of the document key, which may name a method
/// that is not eligible for exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub path: String,
    pub method: String,
    pub operation: Operation,
}
