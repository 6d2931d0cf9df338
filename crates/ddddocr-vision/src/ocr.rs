//! Captcha text recognition with a CTC model via ONNX Runtime.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::value::Tensor;
use serde::Deserialize;

use crate::backend::TextRecognizer;
use crate::model::ModelSession;
use crate::types::{RecognitionError, RecognitionResult};

/// Default OCR model filename inside the model directory.
pub const OCR_MODEL_FILENAME: &str = "common_old.onnx";

/// Default charset filename inside the model directory.
pub const CHARSET_FILENAME: &str = "charset.json";

/// The model expects images scaled to this height, width keeping aspect ratio.
const OCR_IMAGE_HEIGHT: u32 = 64;

/// On-disk charset description. Index 0 is the CTC blank.
#[derive(Debug, Deserialize)]
struct CharsetFile {
    charset: Vec<String>,
}

/// Engine for reading captcha text.
#[derive(Debug)]
pub struct OcrEngine {
    model: ModelSession,
    charset: Vec<String>,
}

impl OcrEngine {
    /// Load the OCR model and its charset.
    pub fn open(model_path: &Path, charset_path: &Path) -> RecognitionResult<Self> {
        let charset = load_charset(charset_path)?;
        let model = ModelSession::load(model_path)?;
        tracing::info!(
            "OCR engine ready ({} with {} symbols)",
            model.name(),
            charset.len()
        );
        Ok(Self { model, charset })
    }

    /// Load `common_old.onnx` and `charset.json` from a model directory.
    pub fn from_dir(dir: &Path) -> RecognitionResult<Self> {
        Self::open(&dir.join(OCR_MODEL_FILENAME), &dir.join(CHARSET_FILENAME))
    }
}

impl TextRecognizer for OcrEngine {
    fn recognize(&self, image: &[u8]) -> RecognitionResult<String> {
        let img = image::load_from_memory(image)?;
        let tensor = preprocess(&img)?;

        let input_tensor = Tensor::from_array(tensor)
            .map_err(|e| RecognitionError::Inference(format!("Failed to create input tensor: {e}")))?;

        let mut session = self.model.lock()?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| RecognitionError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognitionError::Inference(format!("Failed to extract output: {e}")))?;

        let classes = shape.last().copied().unwrap_or(0);
        if classes <= 0 {
            return Err(RecognitionError::Inference(format!(
                "unexpected OCR output shape {shape:?}"
            )));
        }

        let indices = argmax_rows(data, classes as usize);
        let text = ctc_decode(&indices, &self.charset)?;
        Ok(text)
    }
}

/// Read a charset file of the form `{"charset": ["", "a", "b", ...]}`.
pub fn load_charset(path: &Path) -> RecognitionResult<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        RecognitionError::Model(format!("Failed to read charset {}: {e}", path.display()))
    })?;
    let file: CharsetFile = serde_json::from_str(&raw).map_err(|e| {
        RecognitionError::Model(format!("Invalid charset file {}: {e}", path.display()))
    })?;
    if file.charset.is_empty() {
        return Err(RecognitionError::Model(format!(
            "Charset file {} has no symbols",
            path.display()
        )));
    }
    Ok(file.charset)
}

/// Grayscale, scale to 64 px high, normalize to [-1, 1]. Shape `[1, 1, 64, W]`.
fn preprocess(img: &DynamicImage) -> RecognitionResult<Array4<f32>> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(RecognitionError::InvalidInput("image has no pixels".to_string()));
    }

    let width = ((w as f32 * (OCR_IMAGE_HEIGHT as f32 / h as f32)) as u32).max(1);
    let gray = img
        .resize_exact(width, OCR_IMAGE_HEIGHT, image::imageops::FilterType::Lanczos3)
        .to_luma8();

    let mut tensor = Array4::<f32>::zeros((1, 1, OCR_IMAGE_HEIGHT as usize, width as usize));
    for (x, y, pixel) in gray.enumerate_pixels() {
        let val = pixel.0[0] as f32 / 255.0;
        tensor[[0, 0, y as usize, x as usize]] = (val - 0.5) / 0.5;
    }
    Ok(tensor)
}

/// Best class per time step. Ties resolve to the lowest index.
pub fn argmax_rows(logits: &[f32], classes: usize) -> Vec<usize> {
    logits
        .chunks(classes)
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Greedy CTC decoding: collapse repeats, then drop blanks (index 0).
pub fn ctc_decode(indices: &[usize], charset: &[String]) -> RecognitionResult<String> {
    let mut text = String::new();
    let mut last = 0;

    for &idx in indices {
        if idx == last {
            continue;
        }
        last = idx;
        if idx == 0 {
            continue;
        }
        let symbol = charset.get(idx).ok_or_else(|| {
            RecognitionError::Inference(format!(
                "class index {idx} outside charset of {} symbols",
                charset.len()
            ))
        })?;
        text.push_str(symbol);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn charset() -> Vec<String> {
        ["", "a", "b", "c", "验"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ctc_collapses_repeats_and_blanks() {
        let text = ctc_decode(&[0, 1, 1, 0, 1, 2, 2, 0, 0, 3], &charset()).unwrap();
        assert_eq!(text, "aabc");
    }

    #[test]
    fn test_ctc_unicode_symbols() {
        let text = ctc_decode(&[4, 4, 0, 4], &charset()).unwrap();
        assert_eq!(text, "验验");
    }

    #[test]
    fn test_ctc_out_of_range_index() {
        let err = ctc_decode(&[1, 9], &charset()).unwrap_err();
        assert!(matches!(err, RecognitionError::Inference(_)));
    }

    #[test]
    fn test_argmax_rows_first_max_wins() {
        let logits = [0.1, 0.9, 0.0, 0.5, 0.5, 0.2, -1.0, -2.0, -0.5];
        assert_eq!(argmax_rows(&logits, 3), vec![1, 0, 2]);
    }

    #[test]
    fn test_preprocess_keeps_aspect_ratio() {
        let img = DynamicImage::new_rgb8(120, 40);
        let tensor = preprocess(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, 64, 192]);
        // Black pixels normalize to -1.
        assert!((tensor[[0, 0, 0, 0]] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_charset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHARSET_FILENAME);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(r#"{"charset": ["", "1", "2"]}"#.as_bytes()).unwrap();

        let charset = load_charset(&path).unwrap();
        assert_eq!(charset, vec!["", "1", "2"]);
    }

    #[test]
    fn test_load_charset_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHARSET_FILENAME);
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(load_charset(&path), Err(RecognitionError::Model(_))));

        std::fs::write(&path, br#"{"charset": []}"#).unwrap();
        assert!(matches!(load_charset(&path), Err(RecognitionError::Model(_))));
    }

    #[test]
    fn test_from_dir_without_models_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OcrEngine::from_dir(dir.path()).is_err());
    }
}
