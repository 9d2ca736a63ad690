use serde::{Deserialize, Serialize};

use super::event_log::EventLog;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_samples: usize,
    pub on_screen: usize,
    pub off_screen: usize,
    /// Off-screen share of all samples, 0.0 when nothing was logged.
    pub off_screen_ratio: f64,
    pub snapshots_captured: usize,
    /// Off-screen events that had no frame to capture.
    pub capture_gaps: usize,
    pub first_sample_ms: Option<f64>,
    pub last_sample_ms: Option<f64>,
}

impl SessionSummary {
    pub fn from_log(log: &EventLog) -> Self {
        let total_samples = log.len();
        let off_screen = log.off_screen_count();
        let snapshots_captured = log
            .filter(true)
            .filter(|event| event.snapshot.is_some())
            .count();

        let off_screen_ratio = if total_samples == 0 {
            0.0
        } else {
            off_screen as f64 / total_samples as f64
        };

        Self {
            total_samples,
            on_screen: total_samples - off_screen,
            off_screen,
            off_screen_ratio,
            snapshots_captured,
            capture_gaps: off_screen - snapshots_captured,
            first_sample_ms: log.events().first().map(|event| event.timestamp),
            last_sample_ms: log.events().last().map(|event| event.timestamp),
        }
    }
}
