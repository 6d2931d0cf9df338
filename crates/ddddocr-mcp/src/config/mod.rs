//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

/// Environment variable naming the model directory.
pub const MODEL_DIR_ENV: &str = "DDDDOCR_MODEL_DIR";

/// Resolve the directory holding the ONNX models and charset.
///
/// Order: explicit flag, `DDDDOCR_MODEL_DIR`, `./models` when it exists,
/// then `~/.ddddocr/models`. The directory is not required to exist; a
/// missing model only surfaces when a backend is first built.
pub fn resolve_model_dir(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var(MODEL_DIR_ENV) {
        if !env_path.is_empty() {
            return PathBuf::from(env_path);
        }
    }

    let cwd_models = Path::new("models");
    if cwd_models.is_dir() {
        return cwd_models.to_path_buf();
    }

    resolve_default_model_dir()
}

fn resolve_default_model_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    PathBuf::from(home).join(".ddddocr").join("models")
}
