use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw estimate from the gaze estimator. Coordinates are screen pixels and
/// may fall outside the viewport; `elapsed_ms` is session-relative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "elapsedTime", alias = "t")]
    pub elapsed_ms: f64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, elapsed_ms: f64) -> Self {
        Self { x, y, elapsed_ms }
    }

    /// Integer pixel position used for classification and reporting.
    pub fn rounded(&self) -> (i32, i32) {
        (round_px(self.x), round_px(self.y))
    }
}

fn round_px(value: f64) -> i32 {
    // `as` saturates, and NaN lands on 0.
    value.round() as i32
}

/// Visible screen area at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A captured frame, kept in its transport encoding (`data:image/jpeg;base64,...`)
/// until the archive decodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Archive filename, e.g. `snapshot_3.jpg`.
    pub id: String,
    pub data_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEvent {
    pub x: i32,
    pub y: i32,
    pub timestamp: f64,
    pub off_screen: bool,
    pub snapshot: Option<Snapshot>,
    pub observed_at: DateTime<Utc>,
}

impl ClassifiedEvent {
    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot.as_ref().map(|snapshot| snapshot.id.as_str())
    }
}
