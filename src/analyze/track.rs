//! Positional tracker.
//!
//! Detections are matched across sampled frames by their index in the raw
//! detection list. That keeps the tracker allocation-free and deterministic;
//! the trade-off is that identity is positional, not visual, so movement
//! magnitudes are meaningful in aggregate rather than per subject.

use std::collections::HashMap;

use crate::detect::Detection;

/// Last known centroid per detection index, in pixel coordinates.
pub type PositionMap = HashMap<usize, (f32, f32)>;

/// Match current detections against the previous sample's positions and
/// return the new position map plus a per-index movement magnitude (Euclidean
/// pixel displacement per sampled frame). Indices without a previous position
/// contribute no movement.
pub fn score(detections: &[Detection], previous: &PositionMap) -> (PositionMap, HashMap<usize, f64>) {
    let mut positions = PositionMap::with_capacity(detections.len());
    let mut movements = HashMap::new();

    for detection in detections {
        let centroid = detection.centroid();
        if let Some((px, py)) = previous.get(&detection.index) {
            let dx = f64::from(centroid.0 - px);
            let dy = f64::from(centroid.1 - py);
            movements.insert(detection.index, (dx * dx + dy * dy).sqrt());
        }
        positions.insert(detection.index, centroid);
    }

    (positions, movements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{tracked_detections, BoundingBox, DetectionResult};

    fn detection(index: usize, x: f32, y: f32) -> Detection {
        Detection {
            index,
            bbox: BoundingBox::new(x, y, 60.0, 120.0),
        }
    }

    #[test]
    fn first_sample_produces_positions_but_no_movement() {
        let detections = vec![detection(0, 10.0, 10.0), detection(1, 200.0, 50.0)];
        let (positions, movements) = score(&detections, &PositionMap::new());
        assert_eq!(positions.len(), 2);
        assert!(movements.is_empty());
    }

    #[test]
    fn movement_is_euclidean_displacement() {
        let (previous, _) = score(&[detection(0, 0.0, 0.0)], &PositionMap::new());
        // Centroid shifts by (30, 40): displacement 50.
        let (_, movements) = score(&[detection(0, 30.0, 40.0)], &previous);
        assert_eq!(movements.len(), 1);
        assert!((movements[&0] - 50.0).abs() < 1e-6);
    }

    #[test]
    fn unmatched_indices_contribute_no_movement() {
        let (previous, _) = score(&[detection(0, 0.0, 0.0)], &PositionMap::new());
        let (positions, movements) = score(&[detection(3, 500.0, 500.0)], &previous);
        assert!(movements.is_empty());
        assert!(positions.contains_key(&3));
        assert!(!positions.contains_key(&0));
    }

    #[test]
    fn filtered_noise_never_enters_the_tracker() {
        let result = DetectionResult {
            boxes: vec![
                BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                BoundingBox::new(100.0, 100.0, 60.0, 120.0),
            ],
        };
        let tracked = tracked_detections(&result, 2000.0);
        let (positions, _) = score(&tracked, &PositionMap::new());
        assert_eq!(positions.len(), 1);
        assert!(positions.contains_key(&1));
    }
}
