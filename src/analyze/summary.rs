//! Summary aggregation.

use std::collections::BTreeMap;

use crate::{Alert, Summary, VideoMetadata};

/// Aggregate an alert list into a [`Summary`]. Pure fold over the inputs:
/// summarizing the same alerts twice yields byte-identical output.
pub fn summarize(alerts: &[Alert], metadata: &VideoMetadata) -> Summary {
    let mut alert_types: BTreeMap<String, usize> = BTreeMap::new();
    for alert in alerts {
        *alert_types.entry(alert.alert_type.as_str().to_string()).or_insert(0) += 1;
    }

    let duration_seconds = round2(metadata.duration_seconds());
    let description = if alerts.is_empty() {
        "No incidents detected".to_string()
    } else {
        format!("{} incident(s) detected requiring attention", alerts.len())
    };

    Summary {
        total_frames: metadata.total_frames,
        duration_seconds,
        total_alerts: alerts.len(),
        alert_types,
        description,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
