//! Frame ingestion sources.
//!
//! Sources yield decoded frames at native resolution, in order, exactly once:
//! the sequence is lazy, finite, and forward-only. Reopening is the only way
//! to restart. Underlying handles are released on drop, on every exit path.
//!
//! Two backends exist:
//! - `stub://` synthetic sources, always available, used by tests and demos
//! - local video files via FFmpeg (feature: ingest-ffmpeg)
//!
//! A frame that fails to decode is skipped with a debug log; it never aborts
//! the run. A source that cannot be opened surfaces an [`OpenFailure`].

pub mod file;
#[cfg(feature = "ingest-ffmpeg")]
pub(crate) mod file_ffmpeg;

pub use file::{FileSource, OpenFailure};
