//! Face redaction pipeline.
//!
//! Every frame of the input is processed: faces are located and blurred,
//! then the privacy watermark is drawn regardless of whether any face was
//! found. Output preserves the input's dimensions, frame rate, and frame
//! count, and is written as `blurred_<name>` in the configured output
//! directory. A detector failure on one frame degrades to watermark-only
//! for that frame; it never aborts the run.

mod blur;
pub mod face;
mod watermark;
#[cfg(feature = "encode-ffmpeg")]
mod video_ffmpeg;

pub use blur::blur_region;
pub use face::{FaceDetector, HeuristicFaceDetector, NoopFaceDetector};
pub use watermark::apply_watermark;
#[cfg(feature = "encode-ffmpeg")]
pub use video_ffmpeg::FfmpegSink;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::config::RedactionSettings;
use crate::frame::Frame;
use crate::ingest::FileSource;

/// Receives redacted frames in order. `finish` must be called exactly once
/// after the last frame.
pub trait FrameSink {
    fn write(&mut self, frame: &Frame) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// Blur-and-watermark pipeline. Owns its face detector; construction picks
/// the best detector the build and configuration allow.
pub struct FaceBlurPipeline {
    detector: Box<dyn FaceDetector>,
    settings: RedactionSettings,
}

impl FaceBlurPipeline {
    pub fn new(settings: RedactionSettings) -> Self {
        let detector = face::select_detector(&settings);
        log::info!("redaction pipeline using '{}' face detector", detector.name());
        Self { detector, settings }
    }

    /// Swap in a specific detector, bypassing selection.
    pub fn with_detector(settings: RedactionSettings, detector: Box<dyn FaceDetector>) -> Self {
        Self { detector, settings }
    }

    /// Redact a single frame in place: blur located faces, then watermark.
    pub fn redact_frame(&mut self, frame: &mut Frame) {
        let faces = match self.detector.locate(frame) {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!(
                    "face detection failed at frame {}, watermark only: {e:#}",
                    frame.index
                );
                Vec::new()
            }
        };
        for face in &faces {
            blur::blur_region(frame, face, self.settings.blur_sigma);
        }
        watermark::apply_watermark(frame);
    }

    /// Run the pipeline over a video source, writing every redacted frame to
    /// `sink`. Returns the number of frames written.
    pub fn process_video_to_sink(
        &mut self,
        input: &str,
        sink: &mut dyn FrameSink,
    ) -> Result<u64> {
        let mut source = FileSource::open(input)?;
        let mut written = 0u64;
        while let Some(mut frame) = source.next_frame()? {
            self.redact_frame(&mut frame);
            sink.write(&frame)?;
            written += 1;
        }
        sink.finish()?;
        Ok(written)
    }

    /// Redact a video file end to end. The output lands in the configured
    /// output directory as `blurred_<name>`, same geometry and frame rate as
    /// the input.
    #[cfg(feature = "encode-ffmpeg")]
    pub fn process_video(&mut self, input: &str) -> Result<PathBuf> {
        let source = FileSource::open(input)?;
        let metadata = source.metadata();
        drop(source);

        let output_path = self.output_path_for(Path::new(input))?;
        let mut sink = FfmpegSink::create(
            &output_path,
            metadata.width,
            metadata.height,
            metadata.frame_rate,
        )?;
        let written = self.process_video_to_sink(input, &mut sink)?;
        log::info!(
            "redacted {input}: {written} frames written to {}",
            output_path.display()
        );
        Ok(output_path)
    }

    #[cfg(not(feature = "encode-ffmpeg"))]
    pub fn process_video(&mut self, input: &str) -> Result<PathBuf> {
        let _ = input;
        Err(anyhow!(
            "video redaction output requires the encode-ffmpeg feature"
        ))
    }

    /// Redact a still image. Same pipeline, single frame, written through
    /// the `image` crate.
    pub fn process_image(&mut self, input: &Path) -> Result<PathBuf> {
        let decoded = image::open(input)
            .with_context(|| format!("failed to open image {}", input.display()))?
            .to_rgb8();
        let (width, height) = decoded.dimensions();
        let mut frame = Frame::new(decoded.into_raw(), width, height, 1)?;
        self.redact_frame(&mut frame);

        let output_path = self.output_path_for(input)?;
        let encoded = image::RgbImage::from_raw(width, height, frame.pixels)
            .ok_or_else(|| anyhow!("redacted buffer has wrong length"))?;
        encoded
            .save(&output_path)
            .with_context(|| format!("failed to write image {}", output_path.display()))?;
        Ok(output_path)
    }

    fn output_path_for(&self, input: &Path) -> Result<PathBuf> {
        let name = input
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("input path {} has no file name", input.display()))?;
        let output_dir = Path::new(&self.settings.output_dir);
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;
        Ok(output_dir.join(format!("blurred_{name}")))
    }
}
