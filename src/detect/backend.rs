use anyhow::Result;

use crate::detect::result::DetectionResult;

/// Detection capabilities supported by backends.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    PersonDetection,
    FaceDetection,
}

/// Detector backend trait.
///
/// Backends receive a read-only RGB24 pixel slice and return bounding boxes.
/// The pipeline is agnostic to the underlying model; a backend's internals
/// (classical descriptor scan, ONNX inference, scripted fixtures) are not
/// part of the core contract.
pub trait DetectorBackend: Send {
    /// Backend identifier, used for registry lookup and config selection.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Run detection on a frame. The pixel slice is ephemeral; backends must
    /// not retain it across calls.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
