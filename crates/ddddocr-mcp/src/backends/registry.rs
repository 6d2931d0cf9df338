//! Lazy, once-only construction of the recognition backends.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use ddddocr_vision::{ObjectDetector, RecognitionResult, SlideMatcher, TextRecognizer};

use crate::types::{McpError, McpResult};

use super::factory::{BackendFactory, ModelBackendFactory};

/// The three independently initialized backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Ocr,
    Detection,
    Slider,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Ocr, BackendKind::Detection, BackendKind::Slider];

    /// Key used in health reports.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Ocr => "ocr",
            BackendKind::Detection => "detection",
            BackendKind::Slider => "slider",
        }
    }

    fn index(self) -> usize {
        match self {
            BackendKind::Ocr => 0,
            BackendKind::Detection => 1,
            BackendKind::Slider => 2,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which backends are currently initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub ocr: bool,
    pub detection: bool,
    pub slider: bool,
}

/// Holds at most one instance per backend kind.
///
/// Each `ensure_*` builds its backend on first use and returns the cached
/// handle afterwards. A failed build leaves the slot empty so the next call
/// tries again. Callers share the registry behind a `tokio::sync::Mutex`,
/// which keeps construction of one kind from ever running twice at once.
pub struct BackendRegistry {
    factory: Box<dyn BackendFactory>,
    ocr: Option<Arc<dyn TextRecognizer>>,
    detection: Option<Arc<dyn ObjectDetector>>,
    slider: Option<Arc<dyn SlideMatcher>>,
    builds: [usize; 3],
}

impl BackendRegistry {
    pub fn new(factory: impl BackendFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            ocr: None,
            detection: None,
            slider: None,
            builds: [0; 3],
        }
    }

    /// Registry over the ONNX engines in `model_dir`. Nothing is loaded yet.
    pub fn with_model_dir(model_dir: &Path) -> Self {
        tracing::info!("Model directory: {}", model_dir.display());
        Self::new(ModelBackendFactory::new(model_dir))
    }

    pub fn ensure_ocr(&mut self) -> McpResult<Arc<dyn TextRecognizer>> {
        let factory = &self.factory;
        let builds = &mut self.builds[BackendKind::Ocr.index()];
        ensure_slot(&mut self.ocr, builds, BackendKind::Ocr, || {
            factory.text_recognizer()
        })
    }

    pub fn ensure_detection(&mut self) -> McpResult<Arc<dyn ObjectDetector>> {
        let factory = &self.factory;
        let builds = &mut self.builds[BackendKind::Detection.index()];
        ensure_slot(&mut self.detection, builds, BackendKind::Detection, || {
            factory.object_detector()
        })
    }

    pub fn ensure_slider(&mut self) -> McpResult<Arc<dyn SlideMatcher>> {
        let factory = &self.factory;
        let builds = &mut self.builds[BackendKind::Slider.index()];
        ensure_slot(&mut self.slider, builds, BackendKind::Slider, || {
            factory.slide_matcher()
        })
    }

    /// Successful constructions of `kind` so far; at most one.
    pub fn build_count(&self, kind: BackendKind) -> usize {
        self.builds[kind.index()]
    }

    pub fn is_initialized(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Ocr => self.ocr.is_some(),
            BackendKind::Detection => self.detection.is_some(),
            BackendKind::Slider => self.slider.is_some(),
        }
    }

    /// Snapshot of initialization state. Never triggers construction.
    pub fn status(&self) -> ModuleStatus {
        ModuleStatus {
            ocr: self.is_initialized(BackendKind::Ocr),
            detection: self.is_initialized(BackendKind::Detection),
            slider: self.is_initialized(BackendKind::Slider),
        }
    }
}

fn ensure_slot<T: ?Sized>(
    slot: &mut Option<Arc<T>>,
    builds: &mut usize,
    kind: BackendKind,
    build: impl FnOnce() -> RecognitionResult<Arc<T>>,
) -> McpResult<Arc<T>> {
    if let Some(handle) = slot {
        return Ok(Arc::clone(handle));
    }

    match build() {
        Ok(handle) => {
            tracing::info!("{kind} module initialized");
            *builds += 1;
            *slot = Some(Arc::clone(&handle));
            Ok(handle)
        }
        Err(e) => {
            tracing::error!("{kind} module failed to initialize: {e}");
            Err(McpError::Initialization {
                kind: kind.name(),
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ddddocr_vision::{BoundingBox, RecognitionError, SlideMatch};

    struct Fixed;

    impl TextRecognizer for Fixed {
        fn recognize(&self, _image: &[u8]) -> RecognitionResult<String> {
            Ok("abcd".to_string())
        }
    }

    impl ObjectDetector for Fixed {
        fn detect(&self, _image: &[u8]) -> RecognitionResult<Vec<BoundingBox>> {
            Ok(vec![])
        }
    }

    impl SlideMatcher for Fixed {
        fn slide_match(&self, _t: &[u8], _b: &[u8]) -> RecognitionResult<SlideMatch> {
            Ok(SlideMatch {
                target_x: 0,
                target_y: 0,
                target: BoundingBox(0, 0, 1, 1),
            })
        }
    }

    /// Counts builds; the OCR build fails while `failures` is positive.
    #[derive(Default)]
    struct Counting {
        builds: Arc<AtomicUsize>,
        failures: AtomicUsize,
    }

    impl BackendFactory for Counting {
        fn text_recognizer(&self) -> RecognitionResult<Arc<dyn TextRecognizer>> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(RecognitionError::Model("model missing".to_string()));
            }
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed))
        }

        fn object_detector(&self) -> RecognitionResult<Arc<dyn ObjectDetector>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed))
        }

        fn slide_matcher(&self) -> RecognitionResult<Arc<dyn SlideMatcher>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed))
        }
    }

    #[test]
    fn test_ensure_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let mut registry = BackendRegistry::new(Counting {
            builds: builds.clone(),
            ..Default::default()
        });

        registry.ensure_ocr().unwrap();
        registry.ensure_ocr().unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(registry.build_count(BackendKind::Ocr), 1);
        assert_eq!(registry.build_count(BackendKind::Detection), 0);
        assert_eq!(
            registry.status(),
            ModuleStatus {
                ocr: true,
                detection: false,
                slider: false
            }
        );
    }

    #[test]
    fn test_failed_build_is_retried() {
        let builds = Arc::new(AtomicUsize::new(0));
        let mut registry = BackendRegistry::new(Counting {
            builds: builds.clone(),
            failures: AtomicUsize::new(1),
        });

        let err = registry.ensure_ocr().err().unwrap();
        assert!(matches!(err, McpError::Initialization { kind: "ocr", .. }));
        assert!(!registry.is_initialized(BackendKind::Ocr));

        assert_eq!(registry.build_count(BackendKind::Ocr), 0);

        registry.ensure_ocr().unwrap();
        assert!(registry.is_initialized(BackendKind::Ocr));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut registry = BackendRegistry::new(Counting::default());
        registry.ensure_slider().unwrap();
        registry.ensure_detection().unwrap();
        let status = registry.status();
        assert!(!status.ocr);
        assert!(status.detection);
        assert!(status.slider);
    }

    #[test]
    fn test_kind_names() {
        let names: Vec<_> = BackendKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["ocr", "detection", "slider"]);
    }
}
