pub mod calibration;
pub mod gaze;
pub mod heatmap;
pub mod models;
pub mod proctor;
pub mod report;
pub mod session;
pub mod settings;
pub mod utils;

pub use calibration::{CalibrationPhase, ClickOutcome};
pub use gaze::{
    FrameSource, GazeEstimator, JpegSnapshotCapture, NoCapture, ScriptedEstimator,
    SnapshotCapture, StillFrameSource,
};
pub use models::{ClassifiedEvent, GazeSample, Viewport};
pub use proctor::{EnvironmentStatus, ExportedReport, ProctorController, ProctorSnapshot};
pub use report::EvidenceArchive;
pub use settings::{ProctorSettings, SettingsStore};

/// Install the process logger (reads `RUST_LOG`, honours `GAZEPROCTOR_DEBUG`).
pub fn init_logging() {
    utils::logging::init();
    log::info!("gazeproctor logging initialised");
}
