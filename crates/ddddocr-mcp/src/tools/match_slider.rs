//! `match_slider` tool. Find where a slider piece fits into its background.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::{json, Value};

use ddddocr_vision::SlideMatch;

use crate::backends::BackendRegistry;
use crate::types::envelope::SLIDER_MATCH;
use crate::types::{Envelope, McpError, McpResult, ToolCallResult, ToolDefinition};

use super::input::{load_image, BACKGROUND_BASE64, BACKGROUND_PATH, TARGET_BASE64, TARGET_PATH};
use super::run_blocking;

pub const NAME: &str = "match_slider";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("滑块验证码匹配，返回滑块位置".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                TARGET_BASE64: {
                    "type": "string",
                    "description": "目标图片base64编码"
                },
                BACKGROUND_BASE64: {
                    "type": "string",
                    "description": "背景图片base64编码"
                },
                TARGET_PATH: {
                    "type": "string",
                    "description": "目标图片文件路径"
                },
                BACKGROUND_PATH: {
                    "type": "string",
                    "description": "背景图片文件路径"
                }
            },
            "anyOf": [
                { "required": [TARGET_BASE64, BACKGROUND_BASE64] },
                { "required": [TARGET_PATH, BACKGROUND_PATH] }
            ]
        }),
    }
}

pub async fn execute(args: Value, backends: &Arc<Mutex<BackendRegistry>>) -> ToolCallResult {
    let envelope = match slide_match(&args, backends).await {
        Ok(found) => match serde_json::to_value(found) {
            Ok(result) => Envelope::success(SLIDER_MATCH, result),
            Err(e) => Envelope::failure(SLIDER_MATCH, McpError::from(e).to_string()),
        },
        Err(e) => {
            tracing::error!("Slider match failed: {e}");
            Envelope::failure(SLIDER_MATCH, e.to_string())
        }
    };
    envelope.into_tool_result()
}

/// Each image resolves on its own, base64 before path; both must resolve.
async fn slide_match(args: &Value, backends: &Arc<Mutex<BackendRegistry>>) -> McpResult<SlideMatch> {
    let engine = backends.lock().await.ensure_slider()?;
    let target = load_image(args, TARGET_BASE64, TARGET_PATH)?;
    let background = load_image(args, BACKGROUND_BASE64, BACKGROUND_PATH)?;
    run_blocking(move || engine.slide_match(&target, &background)).await
}
