use crate::models::ClassifiedEvent;

/// Append-only, arrival-ordered store of classified samples.
///
/// The off-screen tally is kept alongside the events so reading it never
/// scans; `reset` is the only way anything leaves the log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<ClassifiedEvent>,
    off_screen_count: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: ClassifiedEvent) {
        if event.off_screen {
            self.off_screen_count += 1;
        }
        self.events.push(event);
    }

    /// Events with the given classification, in arrival order.
    pub fn filter(&self, off_screen: bool) -> impl Iterator<Item = &ClassifiedEvent> + '_ {
        self.events
            .iter()
            .filter(move |event| event.off_screen == off_screen)
    }

    pub fn count(&self, off_screen: bool) -> usize {
        if off_screen {
            self.off_screen_count
        } else {
            self.events.len() - self.off_screen_count
        }
    }

    pub fn off_screen_count(&self) -> usize {
        self.off_screen_count
    }

    pub fn events(&self) -> &[ClassifiedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.off_screen_count = 0;
    }
}
