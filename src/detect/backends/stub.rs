use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{BoundingBox, DetectionResult};

/// Stub backend for tests and demos.
///
/// In scripted mode each `detect` call pops the next fixture from the queue,
/// so a script entry corresponds to one sampled frame in evaluation order.
/// Once the script is exhausted (or in the default unscripted mode) it
/// reports no detections.
pub struct StubBackend {
    script: VecDeque<Vec<BoundingBox>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
        }
    }

    pub fn scripted(frames: Vec<Vec<BoundingBox>>) -> Self {
        Self {
            script: frames.into(),
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(
            capability,
            DetectionCapability::PersonDetection | DetectionCapability::FaceDetection
        )
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        let boxes = self.script.pop_front().unwrap_or_default();
        Ok(DetectionResult { boxes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_fixtures_pop_in_order() {
        let mut backend = StubBackend::scripted(vec![
            vec![BoundingBox::new(0.0, 0.0, 50.0, 100.0)],
            vec![],
        ]);

        let r1 = backend.detect(&[], 0, 0).unwrap();
        assert_eq!(r1.boxes.len(), 1);
        let r2 = backend.detect(&[], 0, 0).unwrap();
        assert!(r2.boxes.is_empty());
        // Exhausted script keeps returning nothing.
        let r3 = backend.detect(&[], 0, 0).unwrap();
        assert!(r3.boxes.is_empty());
    }
}
