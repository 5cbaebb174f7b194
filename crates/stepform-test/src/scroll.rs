//! A scroller that records where the form asked to scroll.

use std::sync::Mutex;

use stepform_forms::{ScrollContainer, ScrollTarget, Scroller};

/// A [`Scroller`] that keeps every request.
#[derive(Debug, Default)]
pub struct RecordingScroller {
    calls: Mutex<Vec<(ScrollTarget, ScrollContainer)>>,
}

impl RecordingScroller {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded request, oldest first.
    pub fn calls(&self) -> Vec<(ScrollTarget, ScrollContainer)> {
        self.lock().clone()
    }

    /// Returns the most recent request.
    pub fn last(&self) -> Option<(ScrollTarget, ScrollContainer)> {
        self.lock().last().cloned()
    }

    /// Forgets the recorded requests.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ScrollTarget, ScrollContainer)>> {
        self.calls.lock().expect("scroller lock poisoned")
    }
}

impl Scroller for RecordingScroller {
    fn scroll_to(&self, target: ScrollTarget, container: ScrollContainer, _duration_ms: u64) {
        self.lock().push((target, container));
    }
}
