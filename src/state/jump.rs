//! Animated "jump to page": steps one page at a time with a fixed delay.

use std::time::Duration;

use web_time::Instant;

use crate::constants::DEFAULT_JUMP_STEP_DELAY_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpState {
    Idle,
    Jumping { target: usize },
}

/// Drives an animated jump. Only one jump may run at a time.
#[derive(Debug, Clone)]
pub struct JumpAnimator {
    state: JumpState,
    step_delay: Duration,
    next_step: Option<Instant>,
}

impl Default for JumpAnimator {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_JUMP_STEP_DELAY_MS))
    }
}

impl JumpAnimator {
    pub fn new(step_delay: Duration) -> Self {
        Self {
            state: JumpState::Idle,
            step_delay,
            next_step: None,
        }
    }

    pub fn state(&self) -> JumpState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, JumpState::Jumping { .. })
    }

    /// Begin a jump from `current` to `target`. The first step is due at `now`.
    ///
    /// Refused (returns `false`) while another jump is running or when there is
    /// nowhere to go.
    pub fn start(&mut self, current: usize, target: usize, now: Instant) -> bool {
        if self.is_busy() {
            log::debug!("Jump to {} ignored, jump already in progress", target);
            return false;
        }
        if current == target {
            return false;
        }
        self.state = JumpState::Jumping { target };
        self.next_step = Some(now);
        true
    }

    /// Next page index to show, if a step is due. `current` is the page shown now;
    /// each step moves one page towards the target.
    pub fn tick(&mut self, current: usize, now: Instant) -> Option<usize> {
        let JumpState::Jumping { target } = self.state else {
            return None;
        };
        if current == target {
            self.finish();
            return None;
        }
        if self.next_step.is_some_and(|due| now < due) {
            return None;
        }

        let next = if target > current { current + 1 } else { current - 1 };
        if next == target {
            self.finish();
        } else {
            self.next_step = Some(now + self.step_delay);
        }
        Some(next)
    }

    /// Abort a running jump (catalog switch, teardown).
    pub fn cancel(&mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.state = JumpState::Idle;
        self.next_step = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(80);

    #[test]
    fn test_steps_through_intermediate_pages() {
        let start = Instant::now();
        let mut jump = JumpAnimator::new(STEP);
        assert!(jump.start(0, 3, start));

        let mut current = 0;
        let mut shown = Vec::new();
        let mut now = start;
        for _ in 0..10 {
            if let Some(next) = jump.tick(current, now) {
                current = next;
                shown.push(next);
            }
            now += Duration::from_millis(40);
        }
        assert_eq!(shown, vec![1, 2, 3]);
        assert_eq!(jump.state(), JumpState::Idle);
    }

    #[test]
    fn test_respects_delay() {
        let start = Instant::now();
        let mut jump = JumpAnimator::new(STEP);
        jump.start(5, 2, start);

        assert_eq!(jump.tick(5, start), Some(4));
        assert_eq!(jump.tick(4, start + Duration::from_millis(79)), None);
        assert_eq!(jump.tick(4, start + STEP), Some(3));
    }

    #[test]
    fn test_concurrent_jump_refused() {
        let start = Instant::now();
        let mut jump = JumpAnimator::new(STEP);
        assert!(jump.start(0, 9, start));
        assert!(!jump.start(0, 2, start));
        assert_eq!(jump.state(), JumpState::Jumping { target: 9 });

        jump.cancel();
        assert!(jump.start(0, 2, start));
    }

    #[test]
    fn test_no_jump_to_current_page() {
        let mut jump = JumpAnimator::default();
        assert!(!jump.start(4, 4, Instant::now()));
        assert!(!jump.is_busy());
    }
}
