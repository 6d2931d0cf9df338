//! Error types and JSON-RPC error codes for the MCP server.

use std::path::PathBuf;

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const BACKEND_INIT_FAILED: i32 = -32850;
    pub const IMAGE_READ_FAILED: i32 = -32851;
    pub const RECOGNITION_FAILED: i32 = -32852;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    /// A tool argument is missing, mistyped, or undecodable.
    #[error("{0}")]
    InvalidArgument(String),

    /// Backend construction failed; the kind stays uninitialized.
    #[error("{kind} module failed to initialize: {message}")]
    Initialization { kind: &'static str, message: String },

    #[error("Failed to read image {}: {source}", .path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The recognition capability itself failed.
    #[error("{0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::InvalidArgument(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::Initialization { .. } => BACKEND_INIT_FAILED,
            McpError::ImageRead { .. } => IMAGE_READ_FAILED,
            McpError::Backend(_) => RECOGNITION_FAILED,
            McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string())
    }
}

impl From<ddddocr_vision::RecognitionError> for McpError {
    fn from(e: ddddocr_vision::RecognitionError) -> Self {
        McpError::Backend(e.to_string())
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_error_becomes_backend() {
        let err: McpError =
            ddddocr_vision::RecognitionError::InvalidInput("bad piece".to_string()).into();
        assert!(matches!(err, McpError::Backend(_)));
        assert_eq!(err.code(), mcp_error_codes::RECOGNITION_FAILED);
        assert!(err.to_string().contains("bad piece"));
    }

    #[test]
    fn test_json_rpc_error_shape() {
        let err = McpError::MethodNotFound("resources/list".to_string());
        let value = serde_json::to_value(err.to_json_rpc_error(RequestId::from(7))).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], -32601);
        assert_eq!(value["error"]["message"], "Method not found: resources/list");
    }
}
