//! `detect_objects` tool. Locate the characters or icons of a click captcha.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use ddddocr_vision::BoundingBox;

use crate::backends::BackendRegistry;
use crate::types::envelope::OBJECT_DETECTION;
use crate::types::{Envelope, McpError, McpResult, ToolCallResult, ToolDefinition};

use super::input::{load_image, single_image_schema, IMAGE_BASE64, IMAGE_PATH};
use super::run_blocking;

pub const NAME: &str = "detect_objects";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("检测验证码中的目标对象".to_string()),
        input_schema: single_image_schema(),
    }
}

pub async fn execute(args: Value, backends: &Arc<Mutex<BackendRegistry>>) -> ToolCallResult {
    let envelope = match detect(&args, backends).await {
        Ok(boxes) => {
            let count = boxes.len();
            match serde_json::to_value(&boxes) {
                Ok(result) => Envelope::success(OBJECT_DETECTION, result).with_count(count),
                Err(e) => Envelope::failure(OBJECT_DETECTION, McpError::from(e).to_string()),
            }
        }
        Err(e) => {
            tracing::error!("Object detection failed: {e}");
            Envelope::failure(OBJECT_DETECTION, e.to_string())
        }
    };
    envelope.into_tool_result()
}

async fn detect(args: &Value, backends: &Arc<Mutex<BackendRegistry>>) -> McpResult<Vec<BoundingBox>> {
    let engine = backends.lock().await.ensure_detection()?;
    let image = load_image(args, IMAGE_BASE64, IMAGE_PATH)?;
    run_blocking(move || engine.detect(&image)).await
}
