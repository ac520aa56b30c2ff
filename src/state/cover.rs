//! Cover page handling: a click on the cover plays a short opening transition
//! before the viewer moves to the first inner page.

use std::time::Duration;

use web_time::Instant;

use crate::constants::COVER_TRANSITION_MS;

#[derive(Debug, Clone)]
pub struct CoverTransition {
    enabled: bool,
    /// Cover styling active; cleared by the opening click, restored on page 0.
    cover_shown: bool,
    duration: Duration,
    done_at: Option<Instant>,
}

impl CoverTransition {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            cover_shown: true,
            duration: Duration::from_millis(COVER_TRANSITION_MS),
            done_at: None,
        }
    }

    pub fn is_on_cover(&self, current_page: usize) -> bool {
        self.enabled && current_page == 0 && self.cover_shown
    }

    pub fn is_transitioning(&self) -> bool {
        self.done_at.is_some()
    }

    /// Handle a click on the page area. Returns `true` if the click opened the
    /// cover and must not flip the page.
    pub fn click(&mut self, current_page: usize, now: Instant) -> bool {
        if !self.is_on_cover(current_page) || self.is_transitioning() {
            return false;
        }
        self.cover_shown = false;
        self.done_at = Some(now + self.duration);
        true
    }

    /// Returns `true` once when the transition finishes; the caller then moves to
    /// page index 1.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.done_at {
            Some(done) if now >= done => {
                self.done_at = None;
                true
            }
            _ => false,
        }
    }

    /// Restore the cover styling whenever page 0 is shown again.
    pub fn on_page_changed(&mut self, current_page: usize) {
        if current_page == 0 && !self.is_transitioning() {
            self.cover_shown = true;
        }
    }
}
