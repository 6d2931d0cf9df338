//! Tool registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::backends::BackendRegistry;
use crate::types::{ToolCallResult, ToolDefinition};

use super::{detect_objects, health_check, match_slider, ocr_recognize};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            ocr_recognize::definition(),
            detect_objects::definition(),
            match_slider::definition(),
            health_check::definition(),
        ]
    }

    /// Run a tool by name. Failures come back inside the result, never as a
    /// protocol error; an unknown name gets a plain text reply.
    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        backends: &Arc<Mutex<BackendRegistry>>,
    ) -> ToolCallResult {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));
        tracing::debug!("Calling tool {name}");

        match name {
            ocr_recognize::NAME => ocr_recognize::execute(args, backends).await,
            detect_objects::NAME => detect_objects::execute(args, backends).await,
            match_slider::NAME => match_slider::execute(args, backends).await,
            health_check::NAME => health_check::execute(backends).await,
            _ => {
                tracing::warn!("Unknown tool requested: {name}");
                ToolCallResult::text(format!("未知工具: {name}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let names: Vec<_> = ToolRegistry::list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec!["ocr_recognize", "detect_objects", "match_slider", "health_check"]
        );
    }

    #[test]
    fn test_recognition_tools_declare_any_of() {
        for tool in ToolRegistry::list_tools() {
            if tool.name == health_check::NAME {
                assert_eq!(tool.input_schema["properties"], serde_json::json!({}));
                assert!(tool.input_schema.get("anyOf").is_none());
            } else {
                assert_eq!(tool.input_schema["anyOf"].as_array().map(Vec::len), Some(2));
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_plain_text() {
        let backends = Arc::new(Mutex::new(BackendRegistry::with_model_dir(
            std::path::Path::new("/nonexistent"),
        )));
        let result = ToolRegistry::call("no_such_tool", None, &backends).await;
        assert_eq!(result.first_text(), Some("未知工具: no_such_tool"));
        assert!(!backends.lock().await.status().ocr);
    }
}
