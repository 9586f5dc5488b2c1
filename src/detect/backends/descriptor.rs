use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{BoundingBox, DetectionResult};

/// Mean gradient magnitude a window must exceed to count as a person
/// candidate.
const EDGE_DENSITY_THRESHOLD: f64 = 18.0;

/// Candidates overlapping more than this are merged by greedy suppression.
const SUPPRESSION_IOU: f32 = 0.3;

/// Lightweight classical person detector.
///
/// Scans person-proportioned windows (2:1 height to width) over a gradient
/// magnitude map and keeps windows whose edge density exceeds a fixed
/// threshold, with greedy overlap suppression. It is a cheap descriptor-based
/// stand-in for a learned detector: adequate for textured upright subjects,
/// blind to much else. The pipeline treats it as one interchangeable backend
/// among several.
pub struct DescriptorBackend {
    window_height: u32,
}

impl DescriptorBackend {
    pub fn new() -> Self {
        Self { window_height: 128 }
    }

    fn windows(&self, width: u32, height: u32) -> (u32, u32, u32) {
        // Window height adapts to small frames so tests with tiny synthetic
        // frames still produce sensible scan geometry.
        let win_h = self.window_height.min(height);
        let win_w = (win_h / 2).max(1).min(width);
        let stride = (win_w / 2).max(1);
        (win_w, win_h, stride)
    }
}

impl Default for DescriptorBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for DescriptorBackend {
    fn name(&self) -> &'static str {
        "descriptor"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::PersonDetection)
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        let expected = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        if width < 4 || height < 4 {
            return Ok(DetectionResult::default());
        }

        let luma = luminance(pixels, width, height);
        let gradient = gradient_magnitude(&luma, width, height);
        let integral = integral_image(&gradient, width, height);

        let (win_w, win_h, stride) = self.windows(width, height);
        let mut candidates: Vec<(f64, BoundingBox)> = Vec::new();
        let mut y = 0;
        while y + win_h <= height {
            let mut x = 0;
            while x + win_w <= width {
                let sum = window_sum(&integral, width, x, y, win_w, win_h);
                let mean = sum / f64::from(win_w * win_h);
                if mean > EDGE_DENSITY_THRESHOLD {
                    candidates.push((
                        mean,
                        BoundingBox::new(x as f32, y as f32, win_w as f32, win_h as f32),
                    ));
                }
                x += stride;
            }
            y += stride;
        }

        Ok(DetectionResult {
            boxes: suppress_overlaps(candidates),
        })
    }
}

fn luminance(pixels: &[u8], width: u32, height: u32) -> Vec<f32> {
    let mut luma = Vec::with_capacity((width * height) as usize);
    for chunk in pixels.chunks_exact(3) {
        luma.push(0.299 * f32::from(chunk[0]) + 0.587 * f32::from(chunk[1]) + 0.114 * f32::from(chunk[2]));
    }
    debug_assert_eq!(luma.len(), (width * height) as usize);
    luma
}

fn gradient_magnitude(luma: &[f32], width: u32, height: u32) -> Vec<f32> {
    let w = width as usize;
    let h = height as usize;
    let mut grad = vec![0.0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let dx = luma[y * w + x + 1] - luma[y * w + x - 1];
            let dy = luma[(y + 1) * w + x] - luma[(y - 1) * w + x];
            grad[y * w + x] = dx.abs() + dy.abs();
        }
    }
    grad
}

/// Summed-area table with a one-cell border of zeros, so a window sum is four
/// lookups.
fn integral_image(values: &[f32], width: u32, height: u32) -> Vec<f64> {
    let w = width as usize + 1;
    let h = height as usize + 1;
    let mut integral = vec![0.0f64; w * h];
    for y in 1..h {
        let mut row_sum = 0.0f64;
        for x in 1..w {
            row_sum += f64::from(values[(y - 1) * (w - 1) + (x - 1)]);
            integral[y * w + x] = integral[(y - 1) * w + x] + row_sum;
        }
    }
    integral
}

fn window_sum(integral: &[f64], width: u32, x: u32, y: u32, win_w: u32, win_h: u32) -> f64 {
    let w = width as usize + 1;
    let (x0, y0) = (x as usize, y as usize);
    let (x1, y1) = (x0 + win_w as usize, y0 + win_h as usize);
    integral[y1 * w + x1] - integral[y0 * w + x1] - integral[y1 * w + x0] + integral[y0 * w + x0]
}

fn intersection_over_union(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix = (a.x + a.w).min(b.x + b.w) - a.x.max(b.x);
    let iy = (a.y + a.h).min(b.y + b.h) - a.y.max(b.y);
    if ix <= 0.0 || iy <= 0.0 {
        return 0.0;
    }
    let inter = ix * iy;
    inter / (a.area() + b.area() - inter)
}

fn suppress_overlaps(mut candidates: Vec<(f64, BoundingBox)>) -> Vec<BoundingBox> {
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    let mut kept: Vec<BoundingBox> = Vec::new();
    for (_, bbox) in candidates {
        if kept
            .iter()
            .all(|k| intersection_over_union(k, &bbox) <= SUPPRESSION_IOU)
        {
            kept.push(bbox);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(width: u32, height: u32, value: u8) -> Vec<u8> {
        vec![value; (width * height * 3) as usize]
    }

    fn checkerboard_block(pixels: &mut [u8], width: u32, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                // 2x2 cells: central differences span two pixels, so a
                // 1-pixel checkerboard would cancel out.
                let value = if ((x / 2) + (y / 2)) % 2 == 0 { 255 } else { 0 };
                let offset = ((y * width + x) * 3) as usize;
                pixels[offset..offset + 3].copy_from_slice(&[value, value, value]);
            }
        }
    }

    #[test]
    fn flat_frames_yield_no_detections() {
        let mut backend = DescriptorBackend::new();
        let result = backend.detect(&flat_frame(320, 240, 128), 320, 240).unwrap();
        assert!(result.boxes.is_empty());
    }

    #[test]
    fn textured_region_yields_detection_over_it() {
        let mut backend = DescriptorBackend::new();
        let mut pixels = flat_frame(320, 240, 128);
        checkerboard_block(&mut pixels, 320, 96, 64, 64, 128);

        let result = backend.detect(&pixels, 320, 240).unwrap();
        assert!(!result.boxes.is_empty());
        let hit = result.boxes.iter().any(|b| {
            let (cx, cy) = b.centroid();
            (96.0..160.0).contains(&cx) && (64.0..192.0).contains(&cy)
        });
        assert!(hit, "no detection overlapped the textured block");
    }

    #[test]
    fn rejects_mismatched_buffers() {
        let mut backend = DescriptorBackend::new();
        assert!(backend.detect(&[0u8; 10], 320, 240).is_err());
    }
}
