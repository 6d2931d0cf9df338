//! Core result and error types shared by all recognition engines.

use serde::{Deserialize, Serialize};

/// An axis-aligned box in pixel coordinates: `[x1, y1, x2, y2]`.
///
/// Serialized as a four-element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox(pub u32, pub u32, pub u32, pub u32);

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.2.saturating_sub(self.0)
    }

    pub fn height(&self) -> u32 {
        self.3.saturating_sub(self.1)
    }
}

/// Location of a slider piece inside its background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideMatch {
    /// Horizontal offset of the opaque piece inside the target image.
    pub target_x: u32,
    /// Vertical offset of the opaque piece inside the target image.
    pub target_y: u32,
    /// Matched rectangle in the background image.
    pub target: BoundingBox,
}

/// Errors that can occur in the recognition engines.
#[derive(thiserror::Error, Debug)]
pub enum RecognitionError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type RecognitionResult<T> = Result<T, RecognitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_serializes_as_array() {
        let bbox = BoundingBox(1, 2, 30, 40);
        assert_eq!(serde_json::to_string(&bbox).unwrap(), "[1,2,30,40]");
        assert_eq!(bbox.width(), 29);
        assert_eq!(bbox.height(), 38);
    }

    #[test]
    fn test_slide_match_shape() {
        let m = SlideMatch {
            target_x: 0,
            target_y: 12,
            target: BoundingBox(101, 12, 151, 62),
        };
        let v = serde_json::to_value(m).unwrap();
        assert_eq!(v["target_x"], 0);
        assert_eq!(v["target_y"], 12);
        assert_eq!(v["target"], serde_json::json!([101, 12, 151, 62]));
    }
}
