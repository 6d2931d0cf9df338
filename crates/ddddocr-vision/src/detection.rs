//! Click-captcha object detection with a YOLOX model via ONNX Runtime.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::value::Tensor;

use crate::backend::ObjectDetector;
use crate::model::ModelSession;
use crate::types::{BoundingBox, RecognitionError, RecognitionResult};

/// Default detection model filename inside the model directory.
pub const DETECTION_MODEL_FILENAME: &str = "common_det.onnx";

/// Square model input size.
const INPUT_SIZE: u32 = 416;

/// Feature map strides of the YOLOX heads.
const STRIDES: [u32; 3] = [8, 16, 32];

/// Letterbox padding value.
const PAD_VALUE: f32 = 114.0;

const SCORE_THRESHOLD: f32 = 0.1;
const NMS_THRESHOLD: f32 = 0.45;

/// A scored box in original image coordinates, before clamping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let xx1 = self.x1.max(other.x1);
        let yy1 = self.y1.max(other.y1);
        let xx2 = self.x2.min(other.x2);
        let yy2 = self.y2.min(other.y2);
        let w = (xx2 - xx1 + 1.0).max(0.0);
        let h = (yy2 - yy1 + 1.0).max(0.0);
        let inter = w * h;
        inter / (self.area() + other.area() - inter)
    }
}

/// Engine for detecting objects in click captchas.
#[derive(Debug)]
pub struct DetectionEngine {
    model: ModelSession,
}

impl DetectionEngine {
    pub fn open(model_path: &Path) -> RecognitionResult<Self> {
        let model = ModelSession::load(model_path)?;
        tracing::info!("Detection engine ready ({})", model.name());
        Ok(Self { model })
    }

    /// Load `common_det.onnx` from a model directory.
    pub fn from_dir(dir: &Path) -> RecognitionResult<Self> {
        Self::open(&dir.join(DETECTION_MODEL_FILENAME))
    }
}

impl ObjectDetector for DetectionEngine {
    fn detect(&self, image: &[u8]) -> RecognitionResult<Vec<BoundingBox>> {
        let img = image::load_from_memory(image)?;
        let (w, h) = img.dimensions();
        let (tensor, ratio) = letterbox(&img)?;

        let input_tensor = Tensor::from_array(tensor)
            .map_err(|e| RecognitionError::Inference(format!("Failed to create input tensor: {e}")))?;

        let mut session = self.model.lock()?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| RecognitionError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognitionError::Inference(format!("Failed to extract output: {e}")))?;

        let attrs = shape.last().copied().unwrap_or(0);
        if attrs < 6 {
            return Err(RecognitionError::Inference(format!(
                "unexpected detection output shape {shape:?}"
            )));
        }

        let candidates = decode_predictions(data, attrs as usize, ratio)?;
        let kept = nms(candidates, NMS_THRESHOLD);
        tracing::debug!("Detected {} objects", kept.len());

        Ok(kept.iter().map(|c| clamp_to_image(c, w, h)).collect())
    }
}

/// Resize keeping aspect ratio into a 416x416 BGR canvas padded with 114.
///
/// Returns the NCHW tensor and the scale ratio applied to the image.
fn letterbox(img: &DynamicImage) -> RecognitionResult<(Array4<f32>, f32)> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(RecognitionError::InvalidInput("image has no pixels".to_string()));
    }

    let size = INPUT_SIZE as f32;
    let ratio = (size / h as f32).min(size / w as f32);
    let rw = ((w as f32 * ratio) as u32).clamp(1, INPUT_SIZE);
    let rh = ((h as f32 * ratio) as u32).clamp(1, INPUT_SIZE);

    let rgb = img
        .resize_exact(rw, rh, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::from_elem(
        (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        PAD_VALUE,
    );
    for (x, y, pixel) in rgb.enumerate_pixels() {
        // The model was trained on BGR input.
        for c in 0..3usize {
            tensor[[0, c, y as usize, x as usize]] = pixel.0[2 - c] as f32;
        }
    }
    Ok((tensor, ratio))
}

/// Decode raw YOLOX rows (`cx, cy, w, h, objectness, class scores...`) into
/// candidates above the score threshold, scaled back by `ratio`.
pub fn decode_predictions(
    raw: &[f32],
    attrs: usize,
    ratio: f32,
) -> RecognitionResult<Vec<Candidate>> {
    let expected: usize = STRIDES
        .iter()
        .map(|s| ((INPUT_SIZE / s) * (INPUT_SIZE / s)) as usize)
        .sum();
    if attrs < 6 || raw.len() != expected * attrs {
        return Err(RecognitionError::Inference(format!(
            "expected {expected} rows of at least 6 values, got {} values",
            raw.len()
        )));
    }

    let mut candidates = Vec::new();
    let mut rows = raw.chunks(attrs);

    for stride in STRIDES {
        let grid = INPUT_SIZE / stride;
        let stride = stride as f32;
        for gy in 0..grid {
            for gx in 0..grid {
                let Some(p) = rows.next() else {
                    continue;
                };

                let best_class = p[5..].iter().copied().fold(f32::MIN, f32::max);
                let score = p[4] * best_class;
                if score <= SCORE_THRESHOLD {
                    continue;
                }

                let cx = (p[0] + gx as f32) * stride;
                let cy = (p[1] + gy as f32) * stride;
                let bw = p[2].exp() * stride;
                let bh = p[3].exp() * stride;

                candidates.push(Candidate {
                    x1: (cx - bw / 2.0) / ratio,
                    y1: (cy - bh / 2.0) / ratio,
                    x2: (cx + bw / 2.0) / ratio,
                    y2: (cy + bh / 2.0) / ratio,
                    score,
                });
            }
        }
    }

    Ok(candidates)
}

/// Class-agnostic non-maximum suppression. Output is sorted by score.
pub fn nms(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) <= threshold) {
            kept.push(candidate);
        }
    }
    kept
}

fn clamp_to_image(c: &Candidate, width: u32, height: u32) -> BoundingBox {
    let x1 = if c.x1 < 0.0 { 0 } else { c.x1 as u32 };
    let y1 = if c.y1 < 0.0 { 0 } else { c.y1 as u32 };
    let x2 = if c.x2 > width as f32 { width } else { c.x2 as u32 };
    let y2 = if c.y2 > height as f32 { height } else { c.y2 as u32 };
    BoundingBox(x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTRS: usize = 6;
    const ROWS: usize = 52 * 52 + 26 * 26 + 13 * 13;

    fn cand(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Candidate {
        Candidate {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_decode_single_hit() {
        let mut raw = vec![0.0f32; ROWS * ATTRS];
        // stride 8 grid, gx = 2, gy = 3
        let row = 3 * 52 + 2;
        raw[row * ATTRS..(row + 1) * ATTRS].copy_from_slice(&[
            0.5,
            0.5,
            4.0f32.ln(),
            2.0f32.ln(),
            0.9,
            0.8,
        ]);

        let found = decode_predictions(&raw, ATTRS, 1.0).unwrap();
        assert_eq!(found.len(), 1);
        let c = found[0];
        assert!((c.x1 - 4.0).abs() < 1e-3);
        assert!((c.y1 - 20.0).abs() < 1e-3);
        assert!((c.x2 - 36.0).abs() < 1e-3);
        assert!((c.y2 - 36.0).abs() < 1e-3);
        assert!((c.score - 0.72).abs() < 1e-5);
    }

    #[test]
    fn test_decode_scales_by_ratio() {
        let mut raw = vec![0.0f32; ROWS * ATTRS];
        raw[..ATTRS].copy_from_slice(&[1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
        let found = decode_predictions(&raw, ATTRS, 0.5).unwrap();
        assert_eq!(found.len(), 1);
        // cx = 8, w = 8 -> x1 = 4 at ratio 1, 8 at ratio 0.5
        assert!((found[0].x1 - 8.0).abs() < 1e-3);
        assert!((found[0].x2 - 24.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_rejects_wrong_row_count() {
        let raw = vec![0.0f32; 10 * ATTRS];
        assert!(decode_predictions(&raw, ATTRS, 1.0).is_err());
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let boxes = vec![
            cand(10.0, 10.0, 50.0, 50.0, 0.6),
            cand(12.0, 12.0, 52.0, 52.0, 0.9),
            cand(100.0, 100.0, 140.0, 140.0, 0.3),
        ];
        let kept = nms(boxes, NMS_THRESHOLD);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.3);
    }

    #[test]
    fn test_clamp_to_image() {
        let bbox = clamp_to_image(&cand(-3.0, 4.7, 130.0, 50.2, 1.0), 120, 60);
        assert_eq!(bbox, BoundingBox(0, 4, 120, 50));
    }

    #[test]
    fn test_letterbox_pads_with_gray() {
        let img = DynamicImage::new_rgb8(208, 104);
        let (tensor, ratio) = letterbox(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 416, 416]);
        assert!((ratio - 2.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 0, 300, 0]], PAD_VALUE);
    }
}
