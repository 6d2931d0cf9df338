//! Capability traits implemented by every recognition backend.
//!
//! All capabilities take raw encoded image bytes (PNG, JPEG, ...) and decode
//! them themselves, so callers never need to know the image format.

use crate::types::{BoundingBox, RecognitionResult, SlideMatch};

/// Reads the text in a captcha image.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> RecognitionResult<String>;
}

/// Finds the objects (characters, icons) in a click-captcha image.
pub trait ObjectDetector: Send + Sync {
    /// Boxes are returned in descending score order.
    fn detect(&self, image: &[u8]) -> RecognitionResult<Vec<BoundingBox>>;
}

/// Locates where a slider piece fits into its background.
pub trait SlideMatcher: Send + Sync {
    fn slide_match(&self, target: &[u8], background: &[u8]) -> RecognitionResult<SlideMatch>;
}
