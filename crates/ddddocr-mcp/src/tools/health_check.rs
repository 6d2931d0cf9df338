//! `health_check` tool. Report liveness and which engines are loaded.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Serialize;
use serde_json::json;

use crate::backends::{BackendRegistry, ModuleStatus};
use crate::types::{ToolCallResult, ToolDefinition, SERVER_NAME, SERVER_VERSION};

pub const NAME: &str = "health_check";

#[derive(Debug, Serialize)]
struct HealthReport {
    service: &'static str,
    status: &'static str,
    modules: ModuleStatus,
    version: &'static str,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: NAME.to_string(),
        description: Some("检查ddddocr服务健康状态".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Reads the registry status only; never initializes a backend.
pub async fn execute(backends: &Arc<Mutex<BackendRegistry>>) -> ToolCallResult {
    let modules = backends.lock().await.status();
    ToolCallResult::pretty_json(&HealthReport {
        service: SERVER_NAME,
        status: "healthy",
        modules,
        version: SERVER_VERSION,
    })
}
