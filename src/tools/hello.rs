//! The hello-world tool, kept as a minimal smoke-test tool.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ToolCallResult, ToolDescriptor, ToolHandler};

/// Returns a customised greeting. Useful for verifying the pipeline without
/// touching the network.
pub struct HelloWorldTool;

#[async_trait]
impl ToolHandler for HelloWorldTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "hello-world".to_string(),
            description: Some(
                "A simple tool that returns a customized greeting message.".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "greeting": {
                        "type": "string",
                        "description": "The greeting message to customize and return."
                    }
                },
                "required": ["greeting"]
            }),
        }
    }

    async fn call(&self, arguments: Value) -> ToolCallResult {
        let greeting = arguments
            .get("greeting")
            .and_then(Value::as_str)
            .unwrap_or("Hello");
        ToolCallResult::text(format!("{greeting} World!"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn greets_with_argument() {
        let result = HelloWorldTool.call(json!({"greeting": "Howdy"})).await;
        assert!(!result.is_error);
        let super::super::ToolContent::Text { text } = &result.content[0];
        assert_eq!(text, "Howdy World!");
    }

    #[tokio::test]
    async fn defaults_when_argument_missing() {
        let result = HelloWorldTool.call(json!({})).await;
        let super::super::ToolContent::Text { text } = &result.content[0];
        assert_eq!(text, "Hello World!");
    }
}
