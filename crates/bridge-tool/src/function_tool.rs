use async_trait::async_trait;
use bridge_core::{Result, Tool, ToolContext, ToolOutcome, ToolResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for tool execution function
pub type ToolFn = Box<
    dyn Fn(
            Arc<dyn ToolContext>,
            Value,
        ) -> Pin<Box<dyn Future<Output = Result<ToolResponse>> + Send>>
        + Send
        + Sync,
>;

/// A function-based tool implementation
pub struct FunctionTool {
    name: String,
    description: String,
    schema: Value,
    execute_fn: ToolFn,
}

impl FunctionTool {
    pub fn builder() -> FunctionToolBuilder {
        FunctionToolBuilder::new()
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        (self.execute_fn)(ctx, params).await
    }
}

/// Builder for FunctionTool
pub struct FunctionToolBuilder {
    name: Option<String>,
    description: Option<String>,
    schema: Option<Value>,
    execute_fn: Option<ToolFn>,
}

impl FunctionToolBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            schema: None,
            execute_fn: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn execute<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<dyn ToolContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        self.execute_fn = Some(Box::new(move |ctx, params| Box::pin(f(ctx, params))));
        self
    }

    pub fn build(self) -> Result<FunctionTool> {
        Ok(FunctionTool {
            name: self
                .name
                .ok_or_else(|| bridge_core::Error::message("Tool name is required"))?,
            description: self
                .description
                .ok_or_else(|| bridge_core::Error::message("Tool description is required"))?,
            schema: self
                .schema
                .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}})),
            execute_fn: self
                .execute_fn
                .ok_or_else(|| bridge_core::Error::message("Tool execute function is required"))?,
        })
    }
}

impl Default for FunctionToolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize tool arguments into a typed request.
///
/// On failure the error is already shaped as the envelope to hand back to
/// the caller, so tools can `match` and return it directly.
pub fn parse_params<T: DeserializeOwned>(
    tool: &str,
    params: Value,
) -> std::result::Result<T, ToolOutcome> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };

    serde_json::from_value(params).map_err(|e| {
        tracing::debug!(tool = %tool, error = %e, "Rejected tool parameters");
        ToolOutcome::failure(
            format!("Invalid parameters: {}", e),
            format!("The arguments supplied to '{}' could not be parsed.", tool),
        )
    })
}
