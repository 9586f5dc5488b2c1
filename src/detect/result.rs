/// Result of running person detection on one frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// Raw bounding boxes in pixel space, before any noise filtering.
    pub boxes: Vec<BoundingBox>,
}

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Geometric center, used as the detection's position proxy.
    pub fn centroid(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// A detection that survived the noise filter.
///
/// `index` is the position within the current frame's raw detection list. It
/// is not a stable identity: the tracker matches indices across frames as a
/// best-effort approximation, not as object tracking.
#[derive(Clone, Copy, Debug)]
pub struct Detection {
    pub index: usize,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn centroid(&self) -> (f32, f32) {
        self.bbox.centroid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_is_box_center() {
        let bbox = BoundingBox::new(10.0, 20.0, 40.0, 80.0);
        assert_eq!(bbox.centroid(), (30.0, 60.0));
        assert_eq!(bbox.area(), 3200.0);
    }
}
