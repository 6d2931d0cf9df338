//! The uniform `{success, result | error, type}` reply of recognition tools.

use serde::Serialize;
use serde_json::Value;

use super::response::ToolCallResult;

pub const OCR_RECOGNITION: &str = "ocr_recognition";
pub const OBJECT_DETECTION: &str = "object_detection";
pub const SLIDER_MATCH: &str = "slider_match";

/// Outcome of one recognition tool call. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Envelope {
    pub fn success(kind: &'static str, result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            count: None,
            error: None,
            kind,
        }
    }

    pub fn failure(kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            count: None,
            error: Some(error.into()),
            kind,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn into_tool_result(self) -> ToolCallResult {
        ToolCallResult::json(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_format() {
        let env = Envelope::success(OBJECT_DETECTION, json!([[1, 2, 3, 4]])).with_count(1);
        let text = serde_json::to_string(&env).unwrap();
        assert_eq!(
            text,
            r#"{"success":true,"result":[[1,2,3,4]],"count":1,"type":"object_detection"}"#
        );
    }

    #[test]
    fn test_failure_wire_format() {
        let env = Envelope::failure(SLIDER_MATCH, "坏图片");
        let text = serde_json::to_string(&env).unwrap();
        assert_eq!(text, r#"{"success":false,"error":"坏图片","type":"slider_match"}"#);
    }
}
