//! Message framing for newline-delimited JSON.

use serde_json::Value;

use crate::types::{JsonRpcMessage, McpError, McpResult, RequestId};

/// Parse a single line of text as a JSON-RPC message.
///
/// Text that is not JSON is a parse error; JSON that is not a JSON-RPC
/// message is an invalid request. A message carrying an `id` that does not
/// decode as a request is also invalid, since it still expects a reply.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))?;
    let has_id = value.get("id").is_some();
    let msg: JsonRpcMessage =
        serde_json::from_value(value).map_err(|e| McpError::InvalidRequest(e.to_string()))?;

    match msg {
        JsonRpcMessage::Notification(notif) if has_id => Err(McpError::InvalidRequest(format!(
            "Request {} has an invalid id",
            notif.method
        ))),
        msg => Ok(msg),
    }
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

/// Error reply for a line that could not be decoded. The id is unknown.
pub fn undecodable_reply(error: &McpError) -> McpResult<Value> {
    serde_json::to_value(error.to_json_rpc_error(RequestId::Null)).map_err(McpError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::error_codes::{INVALID_REQUEST, PARSE_ERROR};

    #[test]
    fn test_parse_request() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Request(_)));
    }

    #[test]
    fn test_parse_notification() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn test_not_json() {
        let err = parse_message("{not json").unwrap_err();
        assert_eq!(err.code(), PARSE_ERROR);

        let reply = undecodable_reply(&err).unwrap();
        assert_eq!(reply["id"], Value::Null);
        assert_eq!(reply["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn test_json_but_not_rpc() {
        let err = parse_message(r#"{"hello":"world"}"#).unwrap_err();
        assert_eq!(err.code(), INVALID_REQUEST);
    }

    #[test]
    fn test_unusable_id_is_invalid_request() {
        let err = parse_message(r#"{"jsonrpc":"2.0","id":{"x":1},"method":"tools/call"}"#).unwrap_err();
        assert_eq!(err.code(), INVALID_REQUEST);
    }

    #[test]
    fn test_fractional_id_is_request() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","id":1.5,"method":"ping"}"#).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Request(_)));
    }

    #[test]
    fn test_frame_keeps_unicode() {
        let framed = frame_message(&serde_json::json!({"text": "未知工具"})).unwrap();
        assert_eq!(framed, "{\"text\":\"未知工具\"}\n");
    }
}
