//! OpenAPI document parser.
//!
//! Reads a fetched OpenAPI 3.0/3.1 (or Swagger 2) document into the small
//! intermediate representation the tool pipeline needs. Parsing is lenient:
//! anything the pipeline does not use is ignored, and a malformed operation
//! is logged and dropped without failing the whole document.

use crate::error::{OpenApiError, Result};
use crate::types::{ApiParameter, Endpoint, Operation, ParameterLocation};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Keys of a path item that name an HTTP operation.
const OPERATION_KEYS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A parsed OpenAPI document.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    /// Whole document, kept for `$ref` resolution
    raw: Value,
    paths: BTreeMap<String, Map<String, Value>>,
}

impl OpenApiDocument {
    /// Build from an already decoded JSON value.
    ///
    /// The value must be an object with a top-level `paths` object.
    pub fn from_value(raw: Value) -> Result<Self> {
        let root = raw
            .as_object()
            .ok_or_else(|| OpenApiError::InvalidSpec("document is not a JSON object".into()))?;
        let paths_value = root
            .get("paths")
            .ok_or_else(|| OpenApiError::InvalidSpec("missing top-level 'paths'".into()))?;
        let paths_map = paths_value
            .as_object()
            .ok_or_else(|| OpenApiError::InvalidSpec("'paths' is not an object".into()))?;

        let mut paths = BTreeMap::new();
        for (path, item) in paths_map {
            match item {
                Value::Object(ops) if !ops.is_empty() => {
                    paths.insert(path.clone(), ops.clone());
                }
                _ => debug!("Ignoring empty path item: {}", path),
            }
        }

        Ok(Self { raw, paths })
    }

    /// Parse a document from a string.
    ///
    /// Tries JSON first, then YAML.
    pub fn from_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| OpenApiError::ParseError(e.to_string()))?;
        Self::from_value(value)
    }

    /// Title from the `info` block, if any.
    pub fn title(&self) -> Option<&str> {
        self.raw.pointer("/info/title").and_then(Value::as_str)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Every (path, method) pair of the document with its operation.
    ///
    /// Non-operation keys of a path item (`parameters`, `summary`, `servers`,
    /// ...) are not endpoints and are left out.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints = Vec::new();

        for (path, item) in &self.paths {
            if item.contains_key("$ref") {
                warn!("Path item references not supported: {}", path);
                continue;
            }

            let shared_params: &[Value] = item
                .get("parameters")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for (method, operation) in item {
                if !OPERATION_KEYS.contains(&method.to_ascii_lowercase().as_str()) {
                    continue;
                }

                match self.parse_operation(operation, shared_params) {
                    Some(operation) => endpoints.push(Endpoint {
                        path: path.clone(),
                        method: method.clone(),
                        operation,
                    }),
                    None => warn!(
                        "Ignoring malformed operation {} {}",
                        method.to_uppercase(),
                        path
                    ),
                }
            }
        }

        debug!("Parsed {} endpoints", endpoints.len());
        endpoints
    }

    fn parse_operation(&self, operation: &Value, shared_params: &[Value]) -> Option<Operation> {
        let op = operation.as_object()?;

        let text = |key: &str| {
            op.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        // Path-level parameters first; an operation-level parameter with the
        // same name and location replaces it.
        let mut parameters: Vec<ApiParameter> = Vec::new();
        let op_params = op
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for raw in shared_params.iter().chain(op_params) {
            let Some(param) = self.parse_parameter(raw) else {
                continue;
            };
            match parameters
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param,
                None => parameters.push(param),
            }
        }

        Some(Operation {
            summary: text("summary"),
            description: text("description"),
            operation_id: op
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string),
            parameters,
            response_content_types: self.response_content_types(op),
            request_body_schema: self.request_body_schema(op),
        })
    }

    fn parse_parameter(&self, raw: &Value) -> Option<ApiParameter> {
        let param = self.resolve(raw)?;

        let (Some(name), Some(location)) = (
            param.get("name").and_then(Value::as_str),
            param.get("in").and_then(Value::as_str),
        ) else {
            warn!("Ignoring parameter without name or location: {}", raw);
            return None;
        };

        let location = ParameterLocation::from_openapi(location);
        let schema = param
            .get("schema")
            .and_then(|s| self.resolve(s))
            .cloned()
            .or_else(|| {
                // Swagger 2 puts the type on the parameter itself
                param
                    .get("type")
                    .map(|t| serde_json::json!({ "type": t }))
            })
            .unwrap_or_else(|| Value::Object(Map::new()));

        Some(ApiParameter {
            name: name.to_string(),
            location,
            required: param
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(location == ParameterLocation::Path),
            schema,
            description: param
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    fn response_content_types(&self, op: &Map<String, Value>) -> Vec<String> {
        let mut types = Vec::new();

        if let Some(responses) = op.get("responses").and_then(Value::as_object) {
            for response in responses.values() {
                let Some(response) = self.resolve(response) else {
                    continue;
                };
                if let Some(content) = response.get("content").and_then(Value::as_object) {
                    types.extend(content.keys().cloned());
                }
            }
        }

        // Swagger 2 declares response media types per operation
        if let Some(produces) = op.get("produces").and_then(Value::as_array) {
            types.extend(produces.iter().filter_map(Value::as_str).map(str::to_string));
        }

        types
    }

    fn request_body_schema(&self, op: &Map<String, Value>) -> Option<Value> {
        let body = self.resolve(op.get("requestBody")?)?;
        let content = body.get("content")?.as_object()?;
        let media = content
            .get("application/json")
            .or_else(|| content.values().next())?;
        self.resolve(media.get("schema")?).cloned()
    }

    /// Follow a local `$ref` (one level of indirection chain at a time).
    fn resolve<'a>(&'a self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        // Bounded to keep reference cycles from looping forever
        for _ in 0..8 {
            let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
                return Some(current);
            };
            let Some(pointer) = reference.strip_prefix('#') else {
                warn!("External references not supported: {}", reference);
                return None;
            };
            match self.raw.pointer(pointer) {
                Some(target) => current = target,
                None => {
                    warn!("Unresolvable reference: {}", reference);
                    return None;
                }
            }
        }
        warn!("Reference chain too deep starting at {}", value);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> OpenApiDocument {
        OpenApiDocument::from_value(json!({
            "openapi": "3.1.0",
            "info": {"title": "PAD API", "version": "3"},
            "components": {
                "parameters": {
                    "Verbose": {"name": "verbose", "in": "query", "schema": {"type": "boolean"}}
                },
                "schemas": {
                    "NewCard": {"type": "object", "properties": {"sample_name": {"type": "string"}}}
                },
                "responses": {
                    "Png": {"description": "image", "content": {"image/png": {}}}
                }
            },
            "paths": {
                "/cards/{id}": {
                    "parameters": [{"name": "id", "in": "path", "schema": {"type": "string"}}],
                    "get": {
                        "summary": "Get card",
                        "parameters": [
                            {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}},
                            {"$ref": "#/components/parameters/Verbose"}
                        ],
                        "responses": {"200": {"description": "ok", "content": {"application/json": {}}}}
                    },
                    "head": {"responses": {}}
                },
                "/cards": {
                    "post": {
                        "requestBody": {"content": {"application/json": {"schema": {"$ref": "#/components/schemas/NewCard"}}}},
                        "responses": {"201": {"description": "created"}}
                    }
                },
                "/cards/{id}/download-image": {
                    "get": {"responses": {"200": {"$ref": "#/components/responses/Png"}}}
                },
                "/empty": null
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_rejects_documents_without_paths() {
        assert!(OpenApiDocument::from_value(json!({"openapi": "3.0.0"})).is_err());
        assert!(OpenApiDocument::from_value(json!({"paths": []})).is_err());
        assert!(OpenApiDocument::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_endpoints_skip_non_operation_keys() {
        let doc = sample();
        assert_eq!(doc.title(), Some("PAD API"));
        assert_eq!(doc.path_count(), 3);

        let endpoints = doc.endpoints();
        let pairs: Vec<(String, String)> = endpoints
            .iter()
            .map(|e| (e.method.clone(), e.path.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("post".to_string(), "/cards".to_string()),
                ("get".to_string(), "/cards/{id}".to_string()),
                ("head".to_string(), "/cards/{id}".to_string()),
                ("get".to_string(), "/cards/{id}/download-image".to_string()),
            ]
        );
    }

    #[test]
    fn test_parameters_merge_and_resolve() {
        let doc = sample();
        let endpoints = doc.endpoints();
        let get_card = endpoints
            .iter()
            .find(|e| e.method == "get" && e.path == "/cards/{id}")
            .unwrap();

        let params = &get_card.operation.parameters;
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "id");
        assert_eq!(params[0].schema, json!({"type": "integer"}));
        assert_eq!(params[1].name, "verbose");
        assert_eq!(params[1].location, ParameterLocation::Query);
        assert_eq!(get_card.operation.summary, "Get card");
        assert_eq!(get_card.operation.description, "");
        assert_eq!(get_card.operation.path_parameters().count(), 1);
    }

    #[test]
    fn test_response_content_types_follow_refs() {
        let doc = sample();
        let endpoints = doc.endpoints();
        let download = endpoints
            .iter()
            .find(|e| e.path.ends_with("download-image"))
            .unwrap();
        assert_eq!(download.operation.response_content_types, vec!["image/png"]);
    }

    #[test]
    fn test_request_body_schema_resolved() {
        let doc = sample();
        let endpoints = doc.endpoints();
        let post = endpoints.iter().find(|e| e.method == "post").unwrap();
        let schema = post.operation.request_body_schema.as_ref().unwrap();
        assert!(schema["properties"]["sample_name"].is_object());
    }

    #[test]
    fn test_from_str_accepts_yaml() {
        let yaml = r#"
openapi: 3.0.0
info:
  title: Example API
  version: 1.0.0
paths:
  /projects:
    get:
      summary: List projects
      responses:
        '200':
          description: Success
"#;
        let doc = OpenApiDocument::from_str(yaml).unwrap();
        let endpoints = doc.endpoints();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].operation.summary, "List projects");
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        let err = OpenApiDocument::from_str("<html>oops</html>").unwrap_err();
        assert!(matches!(
            err,
            OpenApiError::ParseError(_) | OpenApiError::InvalidSpec(_)
        ));
    }
}
