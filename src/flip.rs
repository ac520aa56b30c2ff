//! Adapter around the page-flip animation engine.

/// Narrow seam to whatever draws the flip animation.
pub trait PageFlipEngine {
    /// Animate to the page at `index`. The engine later reports the flip.
    fn turn_to_page(&mut self, index: usize);

    /// Page indices the engine flipped to since the last call, oldest first.
    /// Includes flips the user made by dragging a page corner.
    fn take_flip_events(&mut self) -> Vec<usize>;
}

/// Keeps the engine and the navigation state from echoing each other.
///
/// While a programmatic flip is pending, engine events are ignored until the engine
/// reports the intended target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlipSync {
    pending: Option<usize>,
}

impl FlipSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    /// Drive the engine to `target` unless it is already heading there.
    pub fn turn<E: PageFlipEngine + ?Sized>(&mut self, engine: &mut E, target: usize) {
        if self.pending == Some(target) {
            return;
        }
        self.pending = Some(target);
        engine.turn_to_page(target);
    }

    /// Filter one engine event. Returns the index of a manual flip the state must
    /// follow, or `None` if the event belongs to a programmatic flip.
    pub fn on_flip(&mut self, index: usize) -> Option<usize> {
        match self.pending {
            Some(target) if target == index => {
                self.pending = None;
                None
            }
            Some(target) => {
                log::trace!("Ignoring flip to {} while flipping to {}", index, target);
                None
            }
            None => Some(index),
        }
    }

    /// Forget a pending flip (engine reset or catalog switch).
    pub fn reset(&mut self) {
        self.pending = None;
    }
}

/// Engine that flips instantly and records every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingFlipEngine {
    pub turns: Vec<usize>,
    /// Flips reported on the next `take_flip_events`.
    pub queued: Vec<usize>,
    /// When false, `turn_to_page` does not report the flip back.
    pub silent: bool,
}

impl RecordingFlipEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the user dragging the page over to `index`.
    pub fn user_flip(&mut self, index: usize) {
        self.queued.push(index);
    }
}

impl PageFlipEngine for RecordingFlipEngine {
    fn turn_to_page(&mut self, index: usize) {
        self.turns.push(index);
        if !self.silent {
            self.queued.push(index);
        }
    }

    fn take_flip_events(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.queued)
    }
}
