//! Video analysis pipeline.
//!
//! One run: open the source, walk its frames, detect people on every Nth
//! frame, score movement against the previous sample, evaluate alerts, and
//! fold the alert list into a summary. The loop is single-threaded and
//! blocking; state lives for the duration of the run and is dropped with it.
//!
//! Failure policy follows the source: a source that cannot be opened aborts
//! the run with an [`OpenFailure`](crate::ingest::OpenFailure) and no partial
//! result; a detector error on one sampled frame is logged and that sample is
//! skipped.

mod evaluate;
mod summary;
pub mod track;

pub use evaluate::evaluate_frame;
pub use summary::summarize;

use anyhow::Result;

use crate::config::{AnalysisSettings, UrbansightConfig};
use crate::detect::{
    registry_from_settings, tracked_detections, BackendRegistry, DetectionCapability,
};
use crate::ingest::FileSource;
use crate::{Alert, AnalysisResult};

use track::PositionMap;

/// Owns a detector registry and the analysis thresholds; each call to
/// [`analyze`](VideoAnalyzer::analyze) is an independent run.
pub struct VideoAnalyzer {
    registry: BackendRegistry,
    settings: AnalysisSettings,
}

impl VideoAnalyzer {
    pub fn new(registry: BackendRegistry, settings: AnalysisSettings) -> Self {
        Self { registry, settings }
    }

    pub fn from_config(config: &UrbansightConfig) -> Result<Self> {
        let registry = registry_from_settings(&config.detector)?;
        Ok(Self::new(registry, config.analysis.clone()))
    }

    /// Analyze a video source end to end.
    pub fn analyze(&self, path: &str) -> Result<AnalysisResult> {
        self.analyze_with_sink(path, &mut |_| {})
    }

    /// Analyze a video source, invoking `sink` for every alert as it is
    /// emitted. Alerts arrive in frame order.
    pub fn analyze_with_sink(
        &self,
        path: &str,
        sink: &mut dyn FnMut(&Alert),
    ) -> Result<AnalysisResult> {
        let mut source = FileSource::open(path)?;
        let metadata = source.metadata();
        log::info!(
            "analyzing {path}: {}x{} @ {} fps, {} frames declared",
            metadata.width,
            metadata.height,
            metadata.frame_rate,
            metadata.total_frames
        );

        let mut alerts: Vec<Alert> = Vec::new();
        let mut previous_positions = PositionMap::new();
        let mut frames_seen: u64 = 0;

        while let Some(frame) = source.next_frame()? {
            frames_seen = frame.index;
            if frame.index % self.settings.sample_stride != 0 {
                continue;
            }

            let result = match self.registry.detect_with_capability(
                DetectionCapability::PersonDetection,
                &frame.pixels,
                frame.width,
                frame.height,
            ) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("detection failed at frame {}, skipping sample: {e:#}", frame.index);
                    continue;
                }
            };

            let people_count = result.boxes.len() as u32;
            let tracked = tracked_detections(&result, self.settings.min_detection_area);
            let (positions, movements) = track::score(&tracked, &previous_positions);
            previous_positions = positions;

            for alert in evaluate_frame(
                people_count,
                &movements,
                frame.index,
                metadata.frame_rate,
                &self.settings,
            ) {
                sink(&alert);
                alerts.push(alert);
            }
        }

        // Containers may under- or over-declare their frame count; the
        // summary reports what was actually decoded.
        let mut metadata = metadata;
        metadata.total_frames = frames_seen;

        let summary = summarize(&alerts, &metadata);
        log::info!(
            "analysis of {path} complete: {} frames, {} alerts",
            frames_seen,
            alerts.len()
        );
        Ok(AnalysisResult {
            video: metadata,
            alerts,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, StubBackend};
    use crate::ingest::OpenFailure;

    fn person_box(x: f32) -> BoundingBox {
        // 60x120 = 7200 px^2, comfortably above the noise floor.
        BoundingBox::new(x, 50.0, 60.0, 120.0)
    }

    fn analyzer_with_script(script: Vec<Vec<BoundingBox>>) -> VideoAnalyzer {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::scripted(script));
        VideoAnalyzer::new(registry, AnalysisSettings::default())
    }

    #[test]
    fn stride_samples_every_nth_frame() {
        // 20 frames at stride 5: samples at 5, 10, 15, 20.
        let script = vec![vec![], vec![person_box(0.0); 9], vec![], vec![]];
        let result = analyzer_with_script(script)
            .analyze("stub://cam?frames=20&fps=25&width=64&height=64")
            .unwrap();

        assert_eq!(result.alerts.len(), 1);
        assert_eq!(result.alerts[0].frame, 10);
        assert_eq!(result.alerts[0].timestamp_seconds, 10.0 / 25.0);
        assert_eq!(result.summary.total_alerts, 1);
        assert_eq!(result.summary.alert_types["crowd"], 1);
    }

    #[test]
    fn missing_source_aborts_with_open_failure() {
        let analyzer = analyzer_with_script(vec![]);
        let err = analyzer.analyze("/missing/video.mp4").unwrap_err();
        assert!(err.downcast_ref::<OpenFailure>().is_some());
    }

    #[test]
    fn quiet_video_summarizes_clean() {
        let result = analyzer_with_script(vec![])
            .analyze("stub://cam?frames=10&fps=25&width=64&height=64")
            .unwrap();
        assert!(result.alerts.is_empty());
        assert_eq!(result.summary.description, "No incidents detected");
        assert_eq!(result.video.total_frames, 10);
    }

    #[test]
    fn sink_sees_alerts_in_frame_order() {
        let script = vec![vec![person_box(0.0); 9], vec![person_box(0.0); 16]];
        let mut frames = Vec::new();
        let result = analyzer_with_script(script)
            .analyze_with_sink("stub://cam?frames=10&fps=25&width=64&height=64", &mut |a| {
                frames.push(a.frame)
            })
            .unwrap();
        assert_eq!(frames, vec![5, 10]);
        assert_eq!(result.alerts.len(), 2);
    }

    #[test]
    fn violence_fires_on_fast_displacement() {
        // Same index jumps 200px between samples; mean movement 200 > 50.
        let script = vec![vec![person_box(0.0)], vec![person_box(200.0)]];
        let result = analyzer_with_script(script)
            .analyze("stub://cam?frames=10&fps=25&width=64&height=64")
            .unwrap();
        assert_eq!(result.alerts.len(), 1);
        assert_eq!(result.alerts[0].alert_type, crate::AlertType::Violence);
        assert_eq!(result.alerts[0].frame, 10);
    }

    #[test]
    fn zero_fps_sources_get_zero_timestamps() {
        let script = vec![vec![person_box(0.0); 9], vec![person_box(0.0); 9]];
        let result = analyzer_with_script(script)
            .analyze("stub://cam?frames=10&fps=0&width=64&height=64")
            .unwrap();
        assert!(!result.alerts.is_empty());
        assert!(result.alerts.iter().all(|a| a.timestamp_seconds == 0.0));
        assert_eq!(result.summary.duration_seconds, 0.0);
    }
}
