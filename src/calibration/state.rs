use serde::{Deserialize, Serialize};

pub const CALIBRATION_POINT_COUNT: usize = 9;

/// Percent offsets used on both axes of the 3×3 grid.
const GRID_PERCENTS: [f32; 3] = [5.0, 50.0, 95.0];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PointState {
    Inactive,
    Active,
    Clicked,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationPoint {
    /// Horizontal position, percent of viewport width.
    pub left_pct: f32,
    /// Vertical position, percent of viewport height.
    pub top_pct: f32,
    pub state: PointState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "phase", content = "index")]
pub enum CalibrationPhase {
    NotStarted,
    InProgress(usize),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Click did not target the active point; nothing changed.
    Ignored,
    /// Point accepted; the contained index is now active.
    Advanced(usize),
    /// Ninth point accepted.
    Completed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSession {
    pub points: Vec<CalibrationPoint>,
    pub current_index: usize,
    /// Latched once the ninth click lands; `points` is already cleared by then,
    /// so `current_index` alone cannot tell Complete from NotStarted.
    complete: bool,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CalibrationPhase {
        if self.complete {
            CalibrationPhase::Complete
        } else if self.points.is_empty() {
            CalibrationPhase::NotStarted
        } else {
            CalibrationPhase::InProgress(self.current_index)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Lay out the nine targets row by row with the first one active.
    pub fn start(&mut self) {
        let points = GRID_PERCENTS
            .iter()
            .flat_map(|&top_pct| {
                GRID_PERCENTS.iter().map(move |&left_pct| CalibrationPoint {
                    left_pct,
                    top_pct,
                    state: PointState::Inactive,
                })
            })
            .enumerate()
            .map(|(index, mut point)| {
                if index == 0 {
                    point.state = PointState::Active;
                }
                point
            })
            .collect();

        *self = Self {
            points,
            current_index: 0,
            complete: false,
        };
    }

    pub fn click(&mut self, index: usize) -> ClickOutcome {
        if self.complete || self.points.is_empty() || index != self.current_index {
            return ClickOutcome::Ignored;
        }

        self.points[index].state = PointState::Clicked;
        let next = index + 1;
        self.current_index = next;

        if next < CALIBRATION_POINT_COUNT {
            self.points[next].state = PointState::Active;
            ClickOutcome::Advanced(next)
        } else {
            self.points.clear();
            self.complete = true;
            ClickOutcome::Completed
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
