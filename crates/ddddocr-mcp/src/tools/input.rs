//! Resolves a tool's image arguments into raw bytes.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use crate::types::{McpError, McpResult};

pub const IMAGE_BASE64: &str = "image_base64";
pub const IMAGE_PATH: &str = "image_path";
pub const TARGET_BASE64: &str = "target_base64";
pub const TARGET_PATH: &str = "target_path";
pub const BACKGROUND_BASE64: &str = "background_base64";
pub const BACKGROUND_PATH: &str = "background_path";

/// Input schema of the single-image tools: `image_base64` or `image_path`.
pub fn single_image_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            IMAGE_BASE64: {
                "type": "string",
                "description": "base64编码的图片数据"
            },
            IMAGE_PATH: {
                "type": "string",
                "description": "图片文件路径"
            }
        },
        "anyOf": [
            { "required": [IMAGE_BASE64] },
            { "required": [IMAGE_PATH] }
        ]
    })
}

/// Where one image comes from. Inline base64 always wins over a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Base64(String),
    Path(PathBuf),
}

impl ImageSource {
    /// Pick the source for one image from a `(base64, path)` field pair.
    ///
    /// Empty strings count as absent. Neither field set is an error.
    pub fn from_args(args: &Value, base64_field: &str, path_field: &str) -> McpResult<Self> {
        if let Some(data) = string_field(args, base64_field)?.filter(|s| !s.is_empty()) {
            return Ok(ImageSource::Base64(data.to_string()));
        }
        if let Some(path) = string_field(args, path_field)?.filter(|s| !s.is_empty()) {
            return Ok(ImageSource::Path(PathBuf::from(path)));
        }
        Err(McpError::InvalidArgument(format!(
            "必须提供{base64_field}或{path_field}"
        )))
    }

    /// Read the image bytes. The content is not validated as an image.
    pub fn load(&self) -> McpResult<Vec<u8>> {
        match self {
            ImageSource::Base64(data) => {
                let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| McpError::InvalidArgument(format!("invalid base64 image data: {e}")))
            }
            ImageSource::Path(path) => std::fs::read(path).map_err(|source| McpError::ImageRead {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// Resolve and read one image in a single step.
pub fn load_image(args: &Value, base64_field: &str, path_field: &str) -> McpResult<Vec<u8>> {
    ImageSource::from_args(args, base64_field, path_field)?
        .load()
        .map_err(|e| match e {
            McpError::InvalidArgument(msg) => McpError::InvalidArgument(format!("{base64_field}: {msg}")),
            other => other,
        })
}

fn string_field<'a>(args: &'a Value, field: &str) -> McpResult<Option<&'a str>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(McpError::InvalidArgument(format!("{field} must be a string"))),
    }
}
