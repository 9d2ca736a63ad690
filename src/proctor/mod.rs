pub mod controller;
pub mod state;
pub mod worker;

pub use controller::{ExportedReport, ProctorController, REPORT_ARCHIVE_NAME};
pub use state::{EnvironmentStatus, PendingSample, ProctorSnapshot, ProctorState, SharedCapture};
pub use worker::ingest_sample;
