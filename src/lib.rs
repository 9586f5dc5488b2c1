//! UrbanSight analysis core.
//!
//! This crate implements the video analysis and alerting pipeline behind the
//! UrbanSight surveillance dashboard.
//!
//! # Architecture
//!
//! - `ingest`: frame sources (local video files, synthetic stub sources)
//! - `detect`: person-detector backends behind a swappable trait
//! - `analyze`: sampling loop, positional tracker, alert evaluator, summary
//! - `redact`: face blurring + privacy watermark pipeline
//! - `storage`: append-only alert history (in-memory or SQLite)
//!
//! The analysis loop is single-threaded and blocking: one run owns its frame
//! source and tracker state, returns an [`AnalysisResult`] by value, and keeps
//! no reference to it. Alert history is owned by the caller through an
//! [`AlertStore`]; the core only appends, never mutates or deletes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod analyze;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod redact;
pub mod storage;

pub use analyze::{evaluate_frame, summarize, VideoAnalyzer};
pub use config::UrbansightConfig;
pub use detect::{BackendRegistry, BoundingBox, Detection, DetectionResult, DetectorBackend};
pub use frame::Frame;
pub use ingest::{FileSource, OpenFailure};
pub use redact::FaceBlurPipeline;
pub use storage::{AlertStore, InMemoryAlertStore, SqliteAlertStore, StoredAlert};

// -------------------- Video metadata --------------------

/// Container-level properties, derived once when a source is opened.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Nominal frame rate. 0 when the container does not declare one.
    pub frame_rate: f64,
    pub total_frames: u64,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    /// Duration in seconds, 0 when the frame rate is unknown.
    pub fn duration_seconds(&self) -> f64 {
        frame_timestamp(self.total_frames, self.frame_rate)
    }
}

/// Timestamp of a frame index in seconds. A frame rate of 0 (unknown) maps
/// every frame to 0 rather than dividing by zero.
pub fn frame_timestamp(frame: u64, frame_rate: f64) -> f64 {
    if frame_rate <= 0.0 {
        return 0.0;
    }
    frame as f64 / frame_rate
}

// -------------------- Alert taxonomy --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Crowd,
    Violence,
    /// Unattended-object alerts exist in the taxonomy but are only produced
    /// by external collaborators (demo seeding); the evaluator never derives
    /// them from visual input.
    Object,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Crowd => "crowd",
            AlertType::Violence => "violence",
            AlertType::Object => "object",
        }
    }
}

/// Ordinal alert priority, fixed at creation time and never recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// A single typed alert. Immutable once created; the surrounding service
/// appends these to an ordered history and never rewrites them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub severity: Severity,
    /// Actual frame index in the source video, not a sampled-frame counter.
    pub frame: u64,
    pub timestamp_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// Distinguishes synthetic demo alerts from pipeline-derived ones.
    #[serde(default)]
    pub simulated: bool,
}

// -------------------- Analysis output --------------------

/// Derived, read-only digest of a completed analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_frames: u64,
    /// Rounded to 2 decimal places.
    pub duration_seconds: f64,
    pub total_alerts: usize,
    /// Counts keyed by alert type string; BTreeMap keeps serialization
    /// deterministic so re-aggregation is byte-identical.
    pub alert_types: BTreeMap<String, usize>,
    pub description: String,
}

/// Result of one analysis run. Owned by the caller; the pipeline retains no
/// reference after returning it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub video: VideoMetadata,
    /// Alerts in frame order, exactly as emitted.
    pub alerts: Vec<Alert>,
    pub summary: Summary,
}
