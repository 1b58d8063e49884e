//! REST API tool implementation.

use crate::executor::{HttpExecutor, RequestEnvelope, RequestPayload};
use crate::types::{ApiParameter, HttpMethod, Operation, ParameterLocation};
use async_trait::async_trait;
use bridge_core::{Tool, ToolContext, ToolOutcome, ToolResponse};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Argument key some runtimes wrap every argument in.
const WRAPPED_ARGUMENTS_KEY: &str = "parameters";

/// A tool that executes one PAD API operation.
///
/// Parameter locations are fixed when the tool is built; each call only
/// resolves the URL and picks the argument channel.
pub struct RestApiTool {
    name: String,
    description: String,
    method: HttpMethod,
    path: String,
    base_url: String,
    parameters: Vec<ApiParameter>,
    body_schema: Option<Value>,
    executor: Arc<HttpExecutor>,
}

impl RestApiTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        method: HttpMethod,
        path: impl Into<String>,
        operation: &Operation,
        base_url: impl Into<String>,
        executor: Arc<HttpExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            method,
            path: path.into(),
            base_url: base_url.into(),
            parameters: operation.parameters.clone(),
            body_schema: operation.request_body_schema.clone(),
            executor,
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the URL and argument channel for one call.
    ///
    /// Missing path arguments are not an error here: the `{name}` token stays
    /// in the URL and the upstream rejects the request.
    #[instrument(skip(self, params), fields(tool = %self.name))]
    pub fn plan_request(&self, params: Value) -> Result<RequestEnvelope, ToolOutcome> {
        let mut args = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolOutcome::failure(
                    format!("Invalid parameters: expected an object, got {}", other),
                    format!("The arguments supplied to '{}' could not be parsed.", self.name),
                ));
            }
        };

        if !self.declares(WRAPPED_ARGUMENTS_KEY) && args.len() == 1 {
            match args.remove(WRAPPED_ARGUMENTS_KEY) {
                Some(Value::Object(inner)) => args = inner,
                Some(Value::Null) => {}
                Some(other) => {
                    args.insert(WRAPPED_ARGUMENTS_KEY.to_string(), other);
                }
                None => {}
            }
        }

        let mut url = format!("{}{}", self.base_url, self.path);
        for param in self
            .parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
        {
            if let Some(value) = args.remove(&param.name) {
                url = url.replace(&format!("{{{}}}", param.name), &value_to_string(&value));
            }
        }
        debug!("Resolved URL: {} {}", self.method, url);

        let payload = if self.method.sends_query() {
            RequestPayload::Query(query_pairs(&args))
        } else {
            RequestPayload::Json(Value::Object(args))
        };

        Ok(RequestEnvelope {
            method: self.method,
            url,
            payload,
        })
    }

    fn declares(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
            || self
                .body_schema
                .as_ref()
                .and_then(|s| s.get("properties"))
                .and_then(|p| p.get(name))
                .is_some()
    }
}

/// String form of a JSON value: strings verbatim, everything else as JSON.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Query pairs: arrays become repeated keys, nulls are dropped.
fn query_pairs(args: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in args {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| (key.clone(), value_to_string(v))),
            ),
            other => pairs.push((key.clone(), value_to_string(other))),
        }
    }
    pairs
}

#[async_trait]
impl Tool for RestApiTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut schema = param.schema.clone();
            if let (Some(obj), Some(desc)) = (schema.as_object_mut(), &param.description) {
                obj.entry("description")
                    .or_insert_with(|| Value::String(desc.clone()));
            }
            properties.insert(param.name.clone(), schema);
            if param.required {
                required.push(param.name.clone());
            }
        }

        if let Some(body) = &self.body_schema {
            if let Some(body_props) = body.get("properties").and_then(Value::as_object) {
                for (name, schema) in body_props {
                    properties
                        .entry(name.clone())
                        .or_insert_with(|| schema.clone());
                }
            }
            if let Some(body_required) = body.get("required").and_then(Value::as_array) {
                for name in body_required.iter().filter_map(Value::as_str) {
                    if !required.iter().any(|r| r == name) {
                        required.push(name.to_string());
                    }
                }
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": true,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }

    async fn execute(
        &self,
        _ctx: Arc<dyn ToolContext>,
        params: Value,
    ) -> bridge_core::Result<ToolResponse> {
        let request = match self.plan_request(params) {
            Ok(request) => request,
            Err(outcome) => return Ok(outcome.into()),
        };

        info!("Calling API: {} {}", request.method, request.url);
        Ok(self.executor.execute(&request).await.into())
    }
}
