//! Slider captcha matching: find where the puzzle piece fits its background.
//!
//! Both images are reduced to binary edge maps and the piece's edges are
//! located in the background with normalized cross-correlation.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};

use crate::backend::SlideMatcher;
use crate::types::{BoundingBox, RecognitionError, RecognitionResult, SlideMatch};

/// Sobel magnitude above which a pixel counts as an edge.
const EDGE_THRESHOLD: f32 = 100.0;

/// Pure image-processing slide matcher; needs no model files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlideEngine;

impl SlideEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SlideMatcher for SlideEngine {
    fn slide_match(&self, target: &[u8], background: &[u8]) -> RecognitionResult<SlideMatch> {
        let target = image::load_from_memory(target)?;
        let background = image::load_from_memory(background)?;
        match_piece(&target, &background)
    }
}

/// Locate `target` inside `background`.
pub fn match_piece(target: &DynamicImage, background: &DynamicImage) -> RecognitionResult<SlideMatch> {
    let (offset_x, offset_y, crop_w, crop_h) = opaque_region(target);

    let target_edges = edge_map(&flatten_on_black(target));
    let piece = image::imageops::crop_imm(&target_edges, offset_x, offset_y, crop_w, crop_h).to_image();
    let background_edges = edge_map(&background.to_luma8());

    let (x, y) = match_template(&background_edges, &piece)?;
    tracing::debug!("Slider piece matched at ({x}, {y})");

    Ok(SlideMatch {
        target_x: offset_x,
        target_y: offset_y,
        target: BoundingBox(x, y, x + crop_w, y + crop_h),
    })
}

/// Bounding box `(x, y, w, h)` of the non-transparent pixels.
///
/// Images without alpha, or fully transparent ones, use the whole image.
pub fn opaque_region(img: &DynamicImage) -> (u32, u32, u32, u32) {
    let (w, h) = img.dimensions();
    if !img.color().has_alpha() {
        return (0, 0, w, h);
    }

    let rgba = img.to_rgba8();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in rgba.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => (x0, y0, x1 - x0 + 1, y1 - y0 + 1),
        None => (0, 0, w, h),
    }
}

/// Grayscale with transparent pixels treated as black.
fn flatten_on_black(img: &DynamicImage) -> GrayImage {
    if !img.color().has_alpha() {
        return img.to_luma8();
    }
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let p = rgba.get_pixel(x, y).0;
        let alpha = p[3] as f32 / 255.0;
        let luma = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        Luma([(luma * alpha).round() as u8])
    })
}

/// Binary Sobel edge map (0 or 255), borders replicated.
pub fn edge_map(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, w as i64 - 1) as u32;
        let cy = y.clamp(0, h as i64 - 1) as u32;
        gray.get_pixel(cx, cy).0[0] as f32
    };

    GrayImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
            - at(x - 1, y - 1)
            - 2.0 * at(x - 1, y)
            - at(x - 1, y + 1);
        let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
            - at(x - 1, y - 1)
            - 2.0 * at(x, y - 1)
            - at(x + 1, y - 1);
        let magnitude = (gx * gx + gy * gy).sqrt();
        Luma([if magnitude > EDGE_THRESHOLD { 255 } else { 0 }])
    })
}

/// Upper bound on `positions x piece pixels` for one match. A typical
/// slider (340x212 background, 60x60 piece) needs about 1.5e8.
pub const MAX_MATCH_WORK: u64 = 2_000_000_000;

/// Top-left corner of the best normalized cross-correlation match
/// (mean-subtracted, like OpenCV's `TM_CCOEFF_NORMED`).
///
/// Window sums come from integral images; only the cross term walks the
/// piece at each position.
pub fn match_template(image: &GrayImage, template: &GrayImage) -> RecognitionResult<(u32, u32)> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 {
        return Err(RecognitionError::InvalidInput("slider piece is empty".to_string()));
    }
    if tw > iw || th > ih {
        return Err(RecognitionError::InvalidInput(format!(
            "slider piece {tw}x{th} is larger than background {iw}x{ih}"
        )));
    }

    let positions = u64::from(iw - tw + 1) * u64::from(ih - th + 1);
    let work = positions * u64::from(tw) * u64::from(th);
    if work > MAX_MATCH_WORK {
        return Err(RecognitionError::InvalidInput(format!(
            "slider images too large to match: {tw}x{th} piece in {iw}x{ih} background"
        )));
    }

    let (iw, ih, tw, th) = (iw as usize, ih as usize, tw as usize, th as usize);
    let pixels = image.as_raw();
    let (integral, integral_sq) = integral_images(pixels, iw, ih);
    let stride = iw + 1;
    let window = |table: &[u64], x: usize, y: usize| -> f64 {
        let total = table[(y + th) * stride + x + tw] + table[y * stride + x]
            - table[y * stride + x + tw]
            - table[(y + th) * stride + x];
        total as f64
    };

    let n = (tw * th) as f64;
    let t: Vec<f64> = template.as_raw().iter().map(|&p| p as f64).collect();
    let t_mean = t.iter().sum::<f64>() / n;
    let t_centered: Vec<f64> = t.iter().map(|v| v - t_mean).collect();
    let t_norm = t_centered.iter().map(|v| v * v).sum::<f64>();

    let mut best = (0u32, 0u32);
    let mut best_score = f64::MIN;

    for y in 0..=(ih - th) {
        for x in 0..=(iw - tw) {
            let mut cross = 0.0;
            for ty in 0..th {
                let row = &pixels[(y + ty) * iw + x..(y + ty) * iw + x + tw];
                let t_row = &t_centered[ty * tw..(ty + 1) * tw];
                cross += row
                    .iter()
                    .zip(t_row)
                    .map(|(&v, &c)| v as f64 * c)
                    .sum::<f64>();
            }
            let sum = window(&integral, x, y);
            let sum_sq = window(&integral_sq, x, y);
            let window_var = sum_sq - sum * sum / n;
            let denom = (t_norm * window_var).sqrt();
            let score = if denom > f64::EPSILON { cross / denom } else { 0.0 };
            if score > best_score {
                best_score = score;
                best = (x as u32, y as u32);
            }
        }
    }

    Ok(best)
}

/// Summed-area tables of the pixel values and their squares, each
/// `(w + 1) x (h + 1)` with a zero first row and column.
fn integral_images(pixels: &[u8], w: usize, h: usize) -> (Vec<u64>, Vec<u64>) {
    let stride = w + 1;
    let mut sum = vec![0u64; stride * (h + 1)];
    let mut sum_sq = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row = 0u64;
        let mut row_sq = 0u64;
        for x in 0..w {
            let v = u64::from(pixels[y * w + x]);
            row += v;
            row_sq += v * v;
            sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
            sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
        }
    }
    (sum, sum_sq)
}
