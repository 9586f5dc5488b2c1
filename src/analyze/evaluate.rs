//! Per-frame alert evaluation.
//!
//! `evaluate_frame` is a pure function of the sampled frame's observations
//! and the configured thresholds: same inputs, same alerts, no I/O. The
//! analysis loop calls it once per sampled frame and appends whatever it
//! returns.

use std::collections::HashMap;

use crate::config::AnalysisSettings;
use crate::{frame_timestamp, Alert, AlertType, Severity};

/// Crowd sizes above this always escalate to High regardless of the
/// configured threshold.
const CROWD_HIGH_THRESHOLD: u32 = 15;

/// Crowd sizes above this produce at least a Low alert.
const CROWD_LOW_THRESHOLD: u32 = 5;

/// Evaluate one sampled frame.
///
/// `people_count` is the raw detection count (before the noise filter);
/// `movements` holds per-subject displacement magnitudes from the tracker.
/// At most one crowd alert and one violence alert are produced per frame.
pub fn evaluate_frame(
    people_count: u32,
    movements: &HashMap<usize, f64>,
    frame: u64,
    frame_rate: f64,
    settings: &AnalysisSettings,
) -> Vec<Alert> {
    let timestamp_seconds = frame_timestamp(frame, frame_rate);
    let mut alerts = Vec::new();

    // One severity ladder: the configured threshold is the Medium rung, with
    // fixed Low and High rungs around it.
    let crowd = if people_count > CROWD_HIGH_THRESHOLD {
        Some((Severity::High, "High crowd density detected"))
    } else if people_count > settings.crowd_threshold {
        Some((Severity::Medium, "Crowd gathering detected"))
    } else if people_count > CROWD_LOW_THRESHOLD {
        Some((Severity::Low, "Small group detected"))
    } else {
        None
    };
    if let Some((severity, message)) = crowd {
        alerts.push(Alert {
            alert_type: AlertType::Crowd,
            message: format!("{message} ({people_count} people)"),
            severity,
            frame,
            timestamp_seconds,
            video_id: None,
            simulated: false,
        });
    }

    if !movements.is_empty() {
        let mean = movements.values().sum::<f64>() / movements.len() as f64;
        if mean > settings.violence_threshold {
            alerts.push(Alert {
                alert_type: AlertType::Violence,
                message: "Sudden movement detected - possible altercation".to_string(),
                severity: Severity::Medium,
                frame,
                timestamp_seconds,
                video_id: None,
                simulated: false,
            });
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AnalysisSettings {
        AnalysisSettings::default()
    }

    fn movements(values: &[f64]) -> HashMap<usize, f64> {
        values.iter().copied().enumerate().collect()
    }

    #[test]
    fn crowd_ladder_boundaries() {
        let s = settings();
        let empty = HashMap::new();

        // 5 people: at the Low rung, not above it.
        assert!(evaluate_frame(5, &empty, 10, 25.0, &s).is_empty());

        let low = evaluate_frame(6, &empty, 10, 25.0, &s);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].severity, Severity::Low);

        // 8 is the configured threshold itself; still Low.
        assert_eq!(evaluate_frame(8, &empty, 10, 25.0, &s)[0].severity, Severity::Low);

        let medium = evaluate_frame(9, &empty, 10, 25.0, &s);
        assert_eq!(medium[0].severity, Severity::Medium);
        assert_eq!(medium[0].alert_type, AlertType::Crowd);

        assert_eq!(evaluate_frame(15, &empty, 10, 25.0, &s)[0].severity, Severity::Medium);
        assert_eq!(evaluate_frame(16, &empty, 10, 25.0, &s)[0].severity, Severity::High);
    }

    #[test]
    fn at_most_one_crowd_alert_per_frame() {
        let alerts = evaluate_frame(40, &HashMap::new(), 10, 25.0, &settings());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[test]
    fn violence_requires_mean_strictly_above_threshold() {
        let s = settings();
        assert!(evaluate_frame(0, &movements(&[50.0]), 10, 25.0, &s).is_empty());

        let alerts = evaluate_frame(0, &movements(&[50.1]), 10, 25.0, &s);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Violence);
        assert_eq!(alerts[0].severity, Severity::Medium);

        // Mean of 30 and 80 is 55.
        assert_eq!(evaluate_frame(0, &movements(&[30.0, 80.0]), 10, 25.0, &s).len(), 1);
    }

    #[test]
    fn no_tracked_movement_means_no_violence_alert() {
        assert!(evaluate_frame(0, &HashMap::new(), 10, 25.0, &settings()).is_empty());
    }

    #[test]
    fn alerts_carry_frame_index_and_timestamp() {
        let alerts = evaluate_frame(20, &HashMap::new(), 150, 30.0, &settings());
        assert_eq!(alerts[0].frame, 150);
        assert_eq!(alerts[0].timestamp_seconds, 5.0);
        assert!(!alerts[0].simulated);
    }

    #[test]
    fn unknown_frame_rate_pins_timestamps_to_zero() {
        let alerts = evaluate_frame(20, &HashMap::new(), 150, 0.0, &settings());
        assert_eq!(alerts[0].timestamp_seconds, 0.0);
    }

    #[test]
    fn crowd_and_violence_can_fire_together() {
        let alerts = evaluate_frame(10, &movements(&[120.0]), 5, 25.0, &settings());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].alert_type, AlertType::Crowd);
        assert_eq!(alerts[1].alert_type, AlertType::Violence);
    }
}
