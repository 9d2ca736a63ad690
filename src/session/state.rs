use chrono::{DateTime, Utc};

use crate::models::{ClassifiedEvent, SessionInfo, SessionStatus};

use super::event_log::EventLog;

/// One exam sitting: tracking flag, the event log, and the snapshot counter.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub id: Option<String>,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    log: EventLog,
    snapshot_counter: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracking(&self) -> bool {
        self.status == SessionStatus::Tracking
    }

    pub fn started(&self) -> bool {
        self.status != SessionStatus::Idle
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn off_screen_count(&self) -> usize {
        self.log.off_screen_count()
    }

    pub fn snapshot_counter(&self) -> u32 {
        self.snapshot_counter
    }

    /// Wipe whatever the previous sitting left and start tracking.
    pub fn begin(&mut self, id: String, now: DateTime<Utc>) {
        *self = Self {
            id: Some(id),
            status: SessionStatus::Tracking,
            started_at: Some(now),
            stopped_at: None,
            log: EventLog::new(),
            snapshot_counter: 0,
        };
    }

    /// Freeze the log. Returns false when nothing was tracking.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        if !self.tracking() {
            return false;
        }
        self.status = SessionStatus::Stopped;
        self.stopped_at = Some(now);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reserve the next snapshot filename. Only called once a frame was
    /// actually captured, so numbering has no holes.
    pub fn next_snapshot_id(&mut self, extension: &str) -> String {
        self.snapshot_counter += 1;
        format!("snapshot_{}.{}", self.snapshot_counter, extension)
    }

    pub fn record(&mut self, event: ClassifiedEvent) {
        self.log.append(event);
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            status: self.status,
            started_at: self.started_at,
            stopped_at: self.stopped_at,
        }
    }
}
