pub mod gaze;
pub mod session;

pub use gaze::{ClassifiedEvent, GazeSample, Snapshot, Viewport};
pub use session::{SessionInfo, SessionStatus};
