use chrono::{DateTime, Utc};

use crate::models::{ClassifiedEvent, GazeSample, Snapshot, Viewport};
use crate::session::Session;

use super::capture::{CapturedFrame, SnapshotCapture};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// True when the point lies outside `[0, width] × [0, height]`. The edges
/// themselves count as on-screen.
pub fn is_off_screen(x: i32, y: i32, viewport: Viewport) -> bool {
    let (x, y) = (i64::from(x), i64::from(y));
    x < 0 || x > i64::from(viewport.width) || y < 0 || y > i64::from(viewport.height)
}

/// Rounded position of a sample and whether it fell off the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub x: i32,
    pub y: i32,
    pub off_screen: bool,
}

pub fn classify(sample: &GazeSample, viewport: Viewport) -> Classification {
    let (x, y) = sample.rounded();
    Classification {
        x,
        y,
        off_screen: is_off_screen(x, y, viewport),
    }
}

/// Ask `capture` for a frame. Missing frames and capture errors both come
/// back as `None`; neither stops the event from being logged.
pub fn capture_frame(capture: &mut dyn SnapshotCapture) -> Option<CapturedFrame> {
    match capture.capture() {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => {
            log_debug!("no video frame available; logging event without snapshot");
            None
        }
        Err(err) => {
            log_warn!("snapshot capture failed, continuing without it: {err:#}");
            None
        }
    }
}

/// Append an already classified sample. A frame is only kept for
/// off-screen samples, and only then is a snapshot filename reserved.
/// Returns `None` without touching the session when it is not tracking.
pub fn record_sample<'a>(
    session: &'a mut Session,
    sample: &GazeSample,
    classification: Classification,
    frame: Option<CapturedFrame>,
    observed_at: DateTime<Utc>,
) -> Option<&'a ClassifiedEvent> {
    if !session.tracking() {
        return None;
    }

    let Classification { x, y, off_screen } = classification;
    let snapshot = frame.filter(|_| off_screen).map(|frame| Snapshot {
        id: session.next_snapshot_id(frame.extension),
        data_url: frame.data_url,
    });

    if off_screen {
        log_debug!(
            "off-screen gaze at ({x}, {y}) t={:.1} snapshot={}",
            sample.elapsed_ms,
            snapshot.as_ref().map(|s| s.id.as_str()).unwrap_or("none")
        );
    }

    session.record(ClassifiedEvent {
        x,
        y,
        timestamp: sample.elapsed_ms,
        off_screen,
        snapshot,
        observed_at,
    });

    session.log().events().last()
}

/// Classify, capture, and record one sample in a single synchronous pass.
///
/// Returns `None` without touching the session when it is not tracking.
/// Otherwise exactly one event is appended; off-screen samples also ask
/// `capture` for a frame and name it from the session's snapshot counter.
pub fn process_sample<'a>(
    session: &'a mut Session,
    sample: GazeSample,
    viewport: Viewport,
    capture: &mut dyn SnapshotCapture,
    observed_at: DateTime<Utc>,
) -> Option<&'a ClassifiedEvent> {
    if !session.tracking() {
        return None;
    }

    let classification = classify(&sample, viewport);
    let frame = if classification.off_screen {
        capture_frame(capture)
    } else {
        None
    };

    record_sample(session, &sample, classification, frame, observed_at)
}
