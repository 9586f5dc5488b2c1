//! Face localization for redaction.
//!
//! Face detection is a degradable capability: the pipeline asks for the best
//! detector the build and configuration can provide and falls back to
//! passthrough when nothing is available. Redaction itself never fails
//! because of the detector; a frame-level detector error means that frame is
//! watermarked but not blurred.

use anyhow::Result;

use crate::config::RedactionSettings;
use crate::detect::BoundingBox;
use crate::frame::Frame;

/// Locates face regions in a frame. Implementations must over-report rather
/// than under-report; a false positive costs a blurred patch, a false
/// negative leaks a face.
pub trait FaceDetector: Send {
    fn name(&self) -> &'static str;
    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>>;
}

/// Passthrough detector: never finds faces. Selected when no real detector
/// is available so the pipeline still produces watermarked output.
pub struct NoopFaceDetector;

impl FaceDetector for NoopFaceDetector {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn locate(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>> {
        Ok(Vec::new())
    }
}

/// Cell size in pixels for the skin-density grid.
const CELL: u32 = 16;

/// Fraction of skin-classified pixels a cell needs to join a face region.
const CELL_SKIN_FRACTION: f32 = 0.45;

/// Classical skin-chromaticity detector.
///
/// Classifies pixels with a fixed RGB skin rule, aggregates them over a
/// coarse cell grid, and grows connected runs of skin-dense cells into face
/// boxes. Crude but self-contained: it needs no model file and errs toward
/// over-blurring on skin-toned regions, which is the right failure mode for
/// a privacy filter.
pub struct HeuristicFaceDetector;

impl HeuristicFaceDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceDetector for HeuristicFaceDetector {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        let cells_x = frame.width.div_ceil(CELL);
        let cells_y = frame.height.div_ceil(CELL);
        if cells_x == 0 || cells_y == 0 {
            return Ok(Vec::new());
        }

        let mut skin_cells = vec![false; (cells_x * cells_y) as usize];
        for cy in 0..cells_y {
            for cx in 0..cells_x {
                let x1 = ((cx + 1) * CELL).min(frame.width);
                let y1 = ((cy + 1) * CELL).min(frame.height);
                let mut skin = 0u32;
                let mut total = 0u32;
                for y in cy * CELL..y1 {
                    for x in cx * CELL..x1 {
                        let offset = frame.pixel_offset(x, y);
                        let (r, g, b) = (
                            frame.pixels[offset],
                            frame.pixels[offset + 1],
                            frame.pixels[offset + 2],
                        );
                        if is_skin(r, g, b) {
                            skin += 1;
                        }
                        total += 1;
                    }
                }
                if total > 0 && (skin as f32 / total as f32) > CELL_SKIN_FRACTION {
                    skin_cells[(cy * cells_x + cx) as usize] = true;
                }
            }
        }

        Ok(grow_regions(&skin_cells, cells_x, cells_y))
    }
}

/// Fixed RGB skin rule (Kovac et al.): bright enough, red-dominant, with a
/// minimum channel spread.
fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let (ri, gi, bi) = (i16::from(r), i16::from(g), i16::from(b));
    let max = ri.max(gi).max(bi);
    let min = ri.min(gi).min(bi);
    r > 95 && g > 40 && b > 20 && max - min > 15 && ri > gi && ri > bi
}

/// Flood-fill connected skin cells into bounding boxes, in pixel units.
fn grow_regions(skin_cells: &[bool], cells_x: u32, cells_y: u32) -> Vec<BoundingBox> {
    let mut visited = vec![false; skin_cells.len()];
    let mut boxes = Vec::new();

    for start in 0..skin_cells.len() {
        if !skin_cells[start] || visited[start] {
            continue;
        }
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(cell) = stack.pop() {
            let cx = cell as u32 % cells_x;
            let cy = cell as u32 / cells_x;
            min_x = min_x.min(cx);
            min_y = min_y.min(cy);
            max_x = max_x.max(cx);
            max_y = max_y.max(cy);

            let mut push = |nx: i64, ny: i64| {
                if nx < 0 || ny < 0 || nx >= i64::from(cells_x) || ny >= i64::from(cells_y) {
                    return;
                }
                let idx = (ny as u32 * cells_x + nx as u32) as usize;
                if skin_cells[idx] && !visited[idx] {
                    visited[idx] = true;
                    stack.push(idx);
                }
            };
            push(i64::from(cx) - 1, i64::from(cy));
            push(i64::from(cx) + 1, i64::from(cy));
            push(i64::from(cx), i64::from(cy) - 1);
            push(i64::from(cx), i64::from(cy) + 1);
        }

        boxes.push(BoundingBox::new(
            (min_x * CELL) as f32,
            (min_y * CELL) as f32,
            ((max_x - min_x + 1) * CELL) as f32,
            ((max_y - min_y + 1) * CELL) as f32,
        ));
    }
    boxes
}

/// Pick the best available detector for the given settings.
///
/// A configured ONNX face model is preferred when the build carries the
/// tract backend. When the configured model cannot be used the pipeline
/// degrades to passthrough (watermark-only output) with a warning rather
/// than failing the run. Without any configured model the classical
/// heuristic detector is the default.
pub fn select_detector(settings: &RedactionSettings) -> Box<dyn FaceDetector> {
    if let Some(model_path) = &settings.face_model_path {
        #[cfg(feature = "backend-tract")]
        match onnx::OnnxFaceDetector::new(model_path) {
            Ok(detector) => return Box::new(detector),
            Err(e) => {
                log::warn!("face model unavailable, degrading to passthrough: {e:#}");
            }
        }
        #[cfg(not(feature = "backend-tract"))]
        log::warn!(
            "face model {} configured but this build has no ONNX support, degrading to passthrough",
            model_path.display()
        );

        return Box::new(NoopFaceDetector);
    }

    Box::new(HeuristicFaceDetector::new())
}

#[cfg(feature = "backend-tract")]
mod onnx {
    use std::path::Path;

    use anyhow::{anyhow, Context, Result};
    use tract_onnx::prelude::*;

    use crate::detect::BoundingBox;
    use crate::frame::Frame;

    use super::FaceDetector;

    const INPUT_WIDTH: u32 = 320;
    const INPUT_HEIGHT: u32 = 240;
    const CONFIDENCE_THRESHOLD: f32 = 0.6;

    /// ONNX face detector. Expects a model emitting rows of
    /// (x, y, w, h, confidence) in normalized coordinates.
    pub struct OnnxFaceDetector {
        model: TypedSimplePlan<TypedModel>,
    }

    impl OnnxFaceDetector {
        pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
            let model_path = model_path.as_ref();
            let model = tract_onnx::onnx()
                .model_for_path(model_path)
                .with_context(|| {
                    format!("failed to load face model from {}", model_path.display())
                })?
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(1, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize),
                    ),
                )
                .context("failed to set face model input fact")?
                .into_optimized()
                .context("failed to optimize face model")?
                .into_runnable()
                .context("failed to build runnable face model")?;
            Ok(Self { model })
        }

        fn build_input(&self, frame: &Frame) -> Tensor {
            // Nearest-neighbour resample to the model's fixed input size.
            let input = tract_ndarray::Array4::from_shape_fn(
                (1, 3, INPUT_HEIGHT as usize, INPUT_WIDTH as usize),
                |(_, channel, y, x)| {
                    let sx = (x as u32 * frame.width / INPUT_WIDTH).min(frame.width - 1);
                    let sy = (y as u32 * frame.height / INPUT_HEIGHT).min(frame.height - 1);
                    f32::from(frame.pixels[frame.pixel_offset(sx, sy) + channel]) / 255.0
                },
            );
            input.into_tensor()
        }
    }

    impl FaceDetector for OnnxFaceDetector {
        fn name(&self) -> &'static str {
            "onnx"
        }

        fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
            if frame.width == 0 || frame.height == 0 {
                return Ok(Vec::new());
            }
            let input = self.build_input(frame);
            let outputs = self
                .model
                .run(tvec!(input.into()))
                .context("face inference failed")?;
            let output = outputs
                .first()
                .ok_or_else(|| anyhow!("face model produced no outputs"))?;
            let view = output
                .to_array_view::<f32>()
                .context("face model output was not f32")?;
            let flat = view
                .as_slice()
                .ok_or_else(|| anyhow!("face model output was not contiguous"))?;
            if flat.len() % 5 != 0 {
                return Err(anyhow!(
                    "face model output length {} is not a multiple of 5",
                    flat.len()
                ));
            }

            let (fw, fh) = (frame.width as f32, frame.height as f32);
            let mut boxes = Vec::new();
            for row in flat.chunks_exact(5) {
                let (x, y, w, h, confidence) = (row[0], row[1], row[2], row[3], row[4]);
                if confidence < CONFIDENCE_THRESHOLD || w <= 0.0 || h <= 0.0 {
                    continue;
                }
                boxes.push(BoundingBox::new(x * fw, y * fh, w * fw, h * fh));
            }
            Ok(boxes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_filled(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgb);
        }
        Frame::new(pixels, width, height, 1).unwrap()
    }

    fn paint(frame: &mut Frame, x0: u32, y0: u32, w: u32, h: u32, rgb: [u8; 3]) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                let offset = frame.pixel_offset(x, y);
                frame.pixels[offset..offset + 3].copy_from_slice(&rgb);
            }
        }
    }

    const SKIN: [u8; 3] = [200, 140, 110];
    const WALL: [u8; 3] = [90, 90, 100];

    #[test]
    fn noop_detector_finds_nothing() {
        let frame = frame_filled(64, 64, SKIN);
        assert!(NoopFaceDetector.locate(&frame).unwrap().is_empty());
    }

    #[test]
    fn skin_block_produces_a_covering_box() {
        let mut frame = frame_filled(160, 160, WALL);
        paint(&mut frame, 48, 32, 48, 64, SKIN);

        let boxes = HeuristicFaceDetector::new().locate(&frame).unwrap();
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        // The box must cover the painted region (over-reporting is fine).
        assert!(b.x <= 48.0 && b.y <= 32.0);
        assert!(b.x + b.w >= 96.0 && b.y + b.h >= 96.0);
    }

    #[test]
    fn neutral_frame_produces_no_boxes() {
        let frame = frame_filled(160, 160, WALL);
        assert!(HeuristicFaceDetector::new().locate(&frame).unwrap().is_empty());
    }

    #[test]
    fn disjoint_skin_blocks_produce_separate_boxes() {
        let mut frame = frame_filled(320, 160, WALL);
        paint(&mut frame, 32, 32, 48, 48, SKIN);
        paint(&mut frame, 224, 64, 48, 48, SKIN);

        let boxes = HeuristicFaceDetector::new().locate(&frame).unwrap();
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn selection_without_model_uses_heuristic() {
        let detector = select_detector(&RedactionSettings::default());
        assert_eq!(detector.name(), "heuristic");
    }

    #[test]
    fn unloadable_model_degrades_to_passthrough() {
        let settings = RedactionSettings {
            face_model_path: Some(std::path::PathBuf::from("/nonexistent/model.onnx")),
            ..RedactionSettings::default()
        };
        let detector = select_detector(&settings);
        assert_eq!(detector.name(), "noop");
    }
}
