//! Construction of recognition backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ddddocr_vision::{
    DetectionEngine, ObjectDetector, OcrEngine, RecognitionResult, SlideEngine, SlideMatcher,
    TextRecognizer,
};

/// Builds one backend of each kind on request.
///
/// The registry calls each method at most once per successful construction;
/// a failed call will be retried on the next tool call that needs the kind.
pub trait BackendFactory: Send + Sync {
    fn text_recognizer(&self) -> RecognitionResult<Arc<dyn TextRecognizer>>;
    fn object_detector(&self) -> RecognitionResult<Arc<dyn ObjectDetector>>;
    fn slide_matcher(&self) -> RecognitionResult<Arc<dyn SlideMatcher>>;
}

/// Builds the ONNX-backed engines from a model directory.
///
/// OCR loads only the recognition model, detection only the detection model,
/// and slide matching loads no model at all.
#[derive(Debug, Clone)]
pub struct ModelBackendFactory {
    model_dir: PathBuf,
}

impl ModelBackendFactory {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl BackendFactory for ModelBackendFactory {
    fn text_recognizer(&self) -> RecognitionResult<Arc<dyn TextRecognizer>> {
        Ok(Arc::new(OcrEngine::from_dir(&self.model_dir)?))
    }

    fn object_detector(&self) -> RecognitionResult<Arc<dyn ObjectDetector>> {
        Ok(Arc::new(DetectionEngine::from_dir(&self.model_dir)?))
    }

    fn slide_matcher(&self) -> RecognitionResult<Arc<dyn SlideMatcher>> {
        Ok(Arc::new(SlideEngine::new()))
    }
}
