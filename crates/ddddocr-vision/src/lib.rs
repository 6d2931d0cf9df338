//! ddddocr-vision: captcha recognition engines for text, click-target and slider captchas.

pub mod backend;
pub mod detection;
pub mod model;
pub mod ocr;
pub mod slide;
pub mod types;

pub use backend::{ObjectDetector, SlideMatcher, TextRecognizer};
pub use detection::{DetectionEngine, DETECTION_MODEL_FILENAME};
pub use model::ModelSession;
pub use ocr::{OcrEngine, CHARSET_FILENAME, OCR_MODEL_FILENAME};
pub use slide::SlideEngine;
pub use types::*;
