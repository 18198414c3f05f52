//! Deadline-carrying timing primitives: the save debounce and the import
//! guard cooldown. Neither touches the wall clock; callers pass `now` in.

use chrono::{DateTime, Duration, Utc};

/// Coalesces rapid successive edits into one deferred action. Each `poke`
/// cancels and restarts the pending deadline, so a burst of edits inside the
/// window fires exactly once, after the last edit.
#[derive(Clone, Debug)]
pub struct Debounce {
    window: Duration,
    deadline: Option<DateTime<Utc>>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm (or re-arm) the deadline at `now + window`.
    pub fn poke(&mut self, now: DateTime<Utc>) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// If the deadline has passed, consume it and return true.
    pub fn fire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A fire-and-forget suppression window. Engaging it while it is already
/// active simply pushes the expiry out, which is what an import overlapping
/// another import needs.
#[derive(Clone, Debug)]
pub struct Cooldown {
    window: Duration,
    until: Option<DateTime<Utc>>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: None,
        }
    }

    pub fn engage(&mut self, now: DateTime<Utc>) {
        self.until = Some(now + self.window);
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}
