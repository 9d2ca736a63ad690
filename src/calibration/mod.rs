pub mod state;

pub use state::{
    CalibrationPhase, CalibrationPoint, CalibrationSession, ClickOutcome, PointState,
    CALIBRATION_POINT_COUNT,
};
