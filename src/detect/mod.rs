//! Person detection backends.
//!
//! Detection is a replaceable capability: the analysis loop only sees the
//! [`DetectorBackend`] trait and the [`BackendRegistry`]. Backends:
//!
//! - `stub`: scripted detections for tests and demos
//! - `descriptor`: lightweight classical gradient-descriptor detector,
//!   always available
//! - `tract`: ONNX object detector filtered to the person class
//!   (feature: backend-tract)
//!
//! Backends return raw bounding boxes. The adapter in this module applies the
//! minimum-area noise filter before boxes are handed to the tracker; the raw
//! count is preserved for crowd-severity evaluation.

mod backend;
mod backends;
mod registry;
mod result;

use anyhow::Result;

pub use backend::{DetectionCapability, DetectorBackend};
pub use backends::DescriptorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection, DetectionResult};

use crate::config::DetectorSettings;

/// Keep only detections large enough to be people, indexed by their position
/// in the raw detection list. Small boxes are treated as noise and never
/// contribute a centroid or a movement score.
pub fn tracked_detections(result: &DetectionResult, min_area: f64) -> Vec<Detection> {
    result
        .boxes
        .iter()
        .enumerate()
        .filter(|(_, bbox)| f64::from(bbox.area()) >= min_area)
        .map(|(index, bbox)| Detection {
            index,
            bbox: *bbox,
        })
        .collect()
}

/// Build a registry from configuration. Unknown backend names fall back to
/// the classical descriptor backend with a warning rather than failing the
/// run; detection is a degradable capability.
pub fn registry_from_settings(settings: &DetectorSettings) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();
    registry.register(DescriptorBackend::new());
    registry.register(StubBackend::new());

    #[cfg(feature = "backend-tract")]
    if let Some(model_path) = &settings.model_path {
        match TractBackend::new(model_path, 640, 480) {
            Ok(backend) => registry.register(backend),
            Err(e) => log::warn!("tract backend unavailable, continuing without it: {e:#}"),
        }
    }

    if registry.set_default(&settings.backend).is_err() {
        log::warn!(
            "detector backend '{}' not registered (available: {}), using 'descriptor'",
            settings.backend,
            registry.list().join(", ")
        );
        registry.set_default("descriptor")?;
    }

    if let Some(backend) = registry.default_backend() {
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow::anyhow!("default backend lock poisoned"))?;
        if let Err(e) = guard.warm_up() {
            log::warn!("backend '{}' warm-up failed: {e:#}", guard.name());
        }
    }
    Ok(registry)
}
