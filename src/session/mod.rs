pub mod event_log;
pub mod state;
pub mod stats;

pub use event_log::EventLog;
pub use state::Session;
pub use stats::SessionSummary;
