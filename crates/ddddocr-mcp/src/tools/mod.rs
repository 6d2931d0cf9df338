//! MCP tool implementations.

pub mod detect_objects;
pub mod health_check;
pub mod input;
pub mod match_slider;
pub mod ocr_recognize;
pub mod registry;

pub use registry::ToolRegistry;

use ddddocr_vision::RecognitionResult;

use crate::types::{McpError, McpResult};

/// Run a backend call on the blocking pool so inference never stalls the
/// stdio loop.
pub(crate) async fn run_blocking<T, F>(f: F) -> McpResult<T>
where
    F: FnOnce() -> RecognitionResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| McpError::Backend(format!("recognition task failed: {e}")))?
        .map_err(McpError::from)
}
