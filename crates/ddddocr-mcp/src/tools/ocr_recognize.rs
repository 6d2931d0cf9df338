//! `ocr_recognize` tool. Read the text of a captcha image.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::backends::BackendRegistry;
use crate::types::envelope::OCR_RECOGNITION;
use crate::types::{Envelope, McpResult, ToolCallResult, ToolDefinition};

use super::input::{load_image, single_image_schema, IMAGE_BASE64, IMAGE_PATH};
use super::run_blocking;

pub const NAME: &str = "ocr_recognize";

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("识别验证码文本内容".to_string()),
        input_schema: single_image_schema(),
    }
}

pub async fn execute(args: Value, backends: &Arc<Mutex<BackendRegistry>>) -> ToolCallResult {
    let envelope = match recognize(&args, backends).await {
        Ok(text) => Envelope::success(OCR_RECOGNITION, Value::String(text)),
        Err(e) => {
            tracing::error!("OCR recognition failed: {e}");
            Envelope::failure(OCR_RECOGNITION, e.to_string())
        }
    };
    envelope.into_tool_result()
}

async fn recognize(args: &Value, backends: &Arc<Mutex<BackendRegistry>>) -> McpResult<String> {
    let engine = backends.lock().await.ensure_ocr()?;
    let image = load_image(args, IMAGE_BASE64, IMAGE_PATH)?;
    run_blocking(move || engine.recognize(&image)).await
}
