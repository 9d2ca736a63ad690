pub mod capture;
pub mod classifier;
pub mod estimator;

pub use capture::{
    CapturedFrame, FrameSource, JpegSnapshotCapture, NoCapture, SnapshotCapture, StillFrameSource,
};
pub use classifier::{
    capture_frame, classify, is_off_screen, process_sample, record_sample, Classification,
};
pub use estimator::{GazeEstimator, GazeListener, ScriptedEstimator};
