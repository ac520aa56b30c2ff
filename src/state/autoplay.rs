//! Recurring auto-play timer, polled with the current time.

use std::time::Duration;

use web_time::Instant;

use crate::constants::DEFAULT_AUTO_PLAY_INTERVAL_MS;

/// Fires once per interval while armed.
#[derive(Debug, Clone)]
pub struct AutoPlayTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Default for AutoPlayTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_AUTO_PLAY_INTERVAL_MS))
    }
}

impl AutoPlayTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Start counting from `now`. No-op if already armed.
    pub fn arm(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.interval);
        }
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    /// Arm or disarm to match `playing`.
    pub fn sync(&mut self, playing: bool, now: Instant) {
        if playing {
            self.arm(now);
        } else {
            self.disarm();
        }
    }

    /// Returns `true` when an interval has elapsed. Fires at most once per call;
    /// after a long stall the schedule restarts from `now` instead of catching up.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let next = due + self.interval;
        self.next_due = Some(if next <= now { now + self.interval } else { next });
        true
    }
}
