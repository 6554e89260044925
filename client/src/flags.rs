//! Short-lived presentation flags (collision shake, move hop).

use std::time::{Duration, Instant};

/// A flag that clears itself once its deadline passes.
///
/// Raising the flag again replaces the pending clear with a new one, and
/// `cancel` drops it early. The flag is polled with the frame's `now`, so it
/// never blocks or spawns anything.
#[derive(Debug, Clone)]
pub struct TransientFlag {
    duration: Duration,
    deadline: Option<Instant>,
}

impl TransientFlag {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    pub fn raise(&mut self, now: Instant) {
        self.deadline = Some(now + self.duration);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now < deadline)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
