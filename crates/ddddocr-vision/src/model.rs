//! ONNX Runtime session loading shared by the model-backed engines.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use ort::session::Session;

use crate::types::{RecognitionError, RecognitionResult};

/// An ONNX session that can be shared between threads.
///
/// `Session::run` needs exclusive access, so calls are serialized.
pub struct ModelSession {
    name: String,
    session: Mutex<Session>,
}

impl ModelSession {
    /// Load a model from disk.
    pub fn load(path: &Path) -> RecognitionResult<Self> {
        if !path.exists() {
            return Err(RecognitionError::Model(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        tracing::info!("Loading ONNX model from {}", path.display());

        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(1)?))
            .and_then(|mut b| b.commit_from_file(path))
            .map_err(|e| RecognitionError::Model(format!("Failed to load ONNX model: {e}")))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("model")
            .to_string();

        tracing::info!("Model {name} loaded successfully");
        Ok(Self {
            name,
            session: Mutex::new(session),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn lock(&self) -> RecognitionResult<MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| RecognitionError::Inference(format!("{} session poisoned", self.name)))
    }
}

impl std::fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSession").field("name", &self.name).finish()
    }
}
