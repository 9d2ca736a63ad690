use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationPhase, CalibrationPoint, CalibrationSession};
use crate::gaze::{classify, record_sample, CapturedFrame, Classification, SnapshotCapture};
use crate::models::{ClassifiedEvent, GazeSample, SessionInfo, Viewport};
use crate::session::{Session, SessionSummary};

/// Capture collaborator shared with the blocking pool.
pub type SharedCapture = Arc<Mutex<Box<dyn SnapshotCapture>>>;

/// Whether the estimator came up. A failed environment blocks exam start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "message")]
pub enum EnvironmentStatus {
    #[default]
    Pending,
    Ready,
    Failed(String),
}

/// A tracked sample between classification and recording. Holds the
/// capture handle when a frame is wanted.
pub struct PendingSample {
    sample: GazeSample,
    classification: Classification,
    session_id: Option<String>,
    observed_at: DateTime<Utc>,
    capture: Option<SharedCapture>,
}

impl PendingSample {
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Capture handle, present only for off-screen samples.
    pub fn capture(&self) -> Option<SharedCapture> {
        self.capture.clone()
    }
}

/// Everything the command surface mutates. Guarded by one lock in the
/// controller so a sample is always classified against a consistent view.
pub struct ProctorState {
    pub calibration: CalibrationSession,
    pub overlay_visible: bool,
    pub session: Session,
    pub viewport: Viewport,
    pub environment: EnvironmentStatus,
    /// Last sample position, tracked or not, for the on-screen cursor.
    pub cursor: Option<(i32, i32)>,
    capture: SharedCapture,
}

impl ProctorState {
    pub fn new(viewport: Viewport, capture: Box<dyn SnapshotCapture>) -> Self {
        Self {
            calibration: CalibrationSession::new(),
            overlay_visible: false,
            session: Session::new(),
            viewport,
            environment: EnvironmentStatus::default(),
            cursor: None,
            capture: Arc::new(Mutex::new(capture)),
        }
    }

    /// Swap the capture collaborator. A capture already running on the old
    /// one finishes against it.
    pub fn set_capture(&mut self, capture: Box<dyn SnapshotCapture>) {
        self.capture = Arc::new(Mutex::new(capture));
    }

    /// First half of routing a sample: move the cursor and classify against
    /// the current viewport. `None` when no exam is tracking.
    pub fn begin_sample(&mut self, sample: GazeSample, now: DateTime<Utc>) -> Option<PendingSample> {
        self.cursor = Some(sample.rounded());
        if !self.session.tracking() {
            return None;
        }

        let classification = classify(&sample, self.viewport);
        Some(PendingSample {
            sample,
            classification,
            session_id: self.session.id.clone(),
            observed_at: now,
            capture: classification.off_screen.then(|| self.capture.clone()),
        })
    }

    /// Second half: log the sample with whatever frame was captured. Dropped
    /// if the exam it was classified for has since stopped or restarted.
    pub fn finish_sample(
        &mut self,
        pending: PendingSample,
        frame: Option<CapturedFrame>,
    ) -> Option<ClassifiedEvent> {
        if self.session.id != pending.session_id {
            return None;
        }
        record_sample(
            &mut self.session,
            &pending.sample,
            pending.classification,
            frame,
            pending.observed_at,
        )
        .cloned()
    }

    pub fn snapshot(&self) -> ProctorSnapshot {
        ProctorSnapshot {
            calibration_phase: self.calibration.phase(),
            calibration_points: self.calibration.points.clone(),
            overlay_visible: self.overlay_visible,
            session: self.session.info(),
            summary: SessionSummary::from_log(self.session.log()),
            viewport: self.viewport,
            environment: self.environment.clone(),
            cursor: self.cursor,
        }
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctorSnapshot {
    pub calibration_phase: CalibrationPhase,
    pub calibration_points: Vec<CalibrationPoint>,
    pub overlay_visible: bool,
    pub session: SessionInfo,
    pub summary: SessionSummary,
    pub viewport: Viewport,
    pub environment: EnvironmentStatus,
    pub cursor: Option<(i32, i32)>,
}
