//! Local file frame source.
//!
//! `FileSource` opens a video container, exposes its metadata once, and then
//! yields frames until exhaustion. Synthetic sources are addressed as
//! `stub://name?frames=N&fps=F&width=W&height=H` and generate deterministic
//! pixels, which keeps the analysis and redaction pipelines testable without
//! media files or codec features.

use anyhow::Result;

use crate::frame::Frame;
use crate::VideoMetadata;

#[cfg(feature = "ingest-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;

/// Structured error for a source that cannot be opened. Analysis aborts
/// cleanly on this; callers can downcast from anyhow to discriminate it from
/// mid-run failures.
#[derive(Clone, Debug)]
pub struct OpenFailure {
    pub path: String,
    pub reason: String,
}

impl std::fmt::Display for OpenFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to open video source {}: {}", self.path, self.reason)
    }
}
impl std::error::Error for OpenFailure {}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource").finish_non_exhaustive()
    }
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(spec) = path.strip_prefix("stub://") {
            let source = SyntheticFileSource::new(spec).map_err(|reason| OpenFailure {
                path: path.to_string(),
                reason,
            })?;
            return Ok(Self {
                backend: FileBackend::Synthetic(source),
            });
        }

        if !std::path::Path::new(path).exists() {
            return Err(OpenFailure {
                path: path.to_string(),
                reason: "no such file".to_string(),
            }
            .into());
        }

        #[cfg(feature = "ingest-ffmpeg")]
        {
            let source = FfmpegFileSource::open(path).map_err(|e| OpenFailure {
                path: path.to_string(),
                reason: format!("{e:#}"),
            })?;
            Ok(Self {
                backend: FileBackend::Ffmpeg(source),
            })
        }
        #[cfg(not(feature = "ingest-ffmpeg"))]
        {
            Err(OpenFailure {
                path: path.to_string(),
                reason: "file ingestion requires the ingest-ffmpeg feature".to_string(),
            }
            .into())
        }
    }

    /// Container properties, derived once on open.
    pub fn metadata(&self) -> VideoMetadata {
        match &self.backend {
            FileBackend::Synthetic(source) => source.metadata(),
            #[cfg(feature = "ingest-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.metadata(),
        }
    }

    /// Next frame, or `None` when the source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    frames: u64,
    frame_rate: f64,
    width: u32,
    height: u32,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticFileSource {
    fn new(spec: &str) -> std::result::Result<Self, String> {
        let mut frames: u64 = 100;
        let mut frame_rate: f64 = 25.0;
        let mut width: u32 = 640;
        let mut height: u32 = 480;

        if let Some((_, query)) = spec.split_once('?') {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("malformed stub parameter '{pair}'"))?;
                match key {
                    "frames" => {
                        frames = value
                            .parse()
                            .map_err(|_| format!("stub frames must be an integer, got '{value}'"))?
                    }
                    "fps" => {
                        frame_rate = value
                            .parse()
                            .map_err(|_| format!("stub fps must be a number, got '{value}'"))?
                    }
                    "width" => {
                        width = value
                            .parse()
                            .map_err(|_| format!("stub width must be an integer, got '{value}'"))?
                    }
                    "height" => {
                        height = value
                            .parse()
                            .map_err(|_| format!("stub height must be an integer, got '{value}'"))?
                    }
                    other => return Err(format!("unknown stub parameter '{other}'")),
                }
            }
        }
        if width == 0 || height == 0 {
            return Err("stub dimensions must be non-zero".to_string());
        }
        if frame_rate < 0.0 {
            return Err("stub fps must not be negative".to_string());
        }

        log::info!("FileSource: opened stub source ({frames} frames @ {frame_rate} fps)");
        Ok(Self {
            frames,
            frame_rate,
            width,
            height,
            frame_count: 0,
            scene_state: 0,
        })
    }

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            frame_rate: self.frame_rate,
            total_frames: self.frames,
            width: self.width,
            height: self.height,
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.frames {
            return Ok(None);
        }
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let pixels = self.generate_synthetic_pixels();
        Ok(Some(Frame::new(
            pixels,
            self.width,
            self.height,
            self.frame_count,
        )?))
    }

    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}
