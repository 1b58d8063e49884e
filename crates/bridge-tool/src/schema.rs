use schemars::{JsonSchema, schema_for};
use serde_json::Value;

/// Generates JSON schema from a Rust type
pub fn generate_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    serde_json::to_value(schema).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct TestParams {
        image_path: String,
        resize_width: Option<u32>,
    }

    #[test]
    fn test_generate_schema() {
        let schema = generate_schema::<TestParams>();
        assert!(schema.is_object());
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["image_path"].is_object());
    }
}
