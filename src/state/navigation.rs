//! Navigation state machine for one viewer instance.
//!
//! All mutations go through the methods below. Every observable change is queued as
//! a [`NavigationEvent`] that the viewer drains each tick and forwards to the host
//! callback.

use crate::constants::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
use crate::host::Host;

/// Pan offset in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanOffset {
    pub x: f32,
    pub y: f32,
}

impl PanOffset {
    pub const ZERO: PanOffset = PanOffset { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Observable state changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationEvent {
    PageChanged(usize),
    AutoPlayChanged(bool),
    FullscreenChanged(bool),
    ZoomChanged(f32),
}

fn clamp_zoom(level: f32) -> f32 {
    if level.is_nan() {
        return 1.0;
    }
    level.clamp(MIN_ZOOM, MAX_ZOOM)
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    current_page: usize,
    total_pages: usize,
    is_playing: bool,
    is_fullscreen: bool,
    zoom_level: f32,
    pan_offset: PanOffset,
    show_thumbnails: bool,
    show_toc: bool,
    is_focused: bool,
    needs_stabilization: bool,
    events: Vec<NavigationEvent>,
}

impl NavigationState {
    /// Create state for a catalog of `total_pages`, starting at `initial_page`
    /// (pulled into range).
    pub fn new(total_pages: usize, initial_page: usize) -> Self {
        Self {
            current_page: initial_page.min(total_pages.saturating_sub(1)),
            total_pages,
            is_playing: false,
            is_fullscreen: false,
            zoom_level: 1.0,
            pan_offset: PanOffset::ZERO,
            show_thumbnails: false,
            show_toc: false,
            is_focused: false,
            needs_stabilization: false,
            events: Vec::new(),
        }
    }

    pub fn with_auto_play(mut self, playing: bool) -> Self {
        self.is_playing = playing;
        self
    }

    pub fn with_thumbnails(mut self, show: bool) -> Self {
        self.show_thumbnails = show;
        self
    }

    pub fn with_toc(mut self, show: bool) -> Self {
        self.show_toc = show;
        self
    }

    /// Start in the fullscreen state the platform already reports. No event.
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.is_fullscreen = fullscreen;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn last_index(&self) -> usize {
        self.total_pages.saturating_sub(1)
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page == 0
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page == self.last_index()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    pub fn zoom_level(&self) -> f32 {
        self.zoom_level
    }

    pub fn pan_offset(&self) -> PanOffset {
        self.pan_offset
    }

    pub fn show_thumbnails(&self) -> bool {
        self.show_thumbnails
    }

    pub fn show_toc(&self) -> bool {
        self.show_toc
    }

    pub fn is_focused(&self) -> bool {
        self.is_focused
    }

    pub fn needs_stabilization(&self) -> bool {
        self.needs_stabilization
    }

    /// Take every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<NavigationEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Page navigation
    // ------------------------------------------------------------------

    fn set_page(&mut self, index: usize) {
        if index != self.current_page {
            self.current_page = index;
            self.events.push(NavigationEvent::PageChanged(index));
        }
    }

    /// Go to `index`. Out-of-range requests are ignored. Returns whether `index`
    /// was accepted.
    pub fn go_to_page(&mut self, index: usize) -> bool {
        if index >= self.total_pages {
            log::debug!(
                "go_to_page({}) out of bounds ({} pages)",
                index,
                self.total_pages
            );
            return false;
        }
        self.set_page(index);
        true
    }

    pub fn next_page(&mut self) {
        self.set_page((self.current_page + 1).min(self.last_index()));
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.current_page.saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.set_page(0);
    }

    pub fn last_page(&mut self) {
        self.set_page(self.last_index());
    }

    /// One auto-play step: like `next_page` but wraps to the first page.
    pub fn advance_auto_play(&mut self) {
        if self.total_pages == 0 {
            return;
        }
        let next = if self.current_page >= self.last_index() {
            0
        } else {
            self.current_page + 1
        };
        self.set_page(next);
    }

    // ------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------

    pub fn toggle_auto_play(&mut self) {
        self.set_playing(!self.is_playing);
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.is_playing != playing {
            self.is_playing = playing;
            self.events.push(NavigationEvent::AutoPlayChanged(playing));
        }
    }

    /// Ask the host to flip fullscreen. The new value is applied only if the host
    /// accepts; a refusal is logged and leaves the state as it was.
    pub fn toggle_fullscreen<H: Host + ?Sized>(&mut self, host: &mut H) {
        let wanted = !self.is_fullscreen;
        match host.set_fullscreen(wanted) {
            Ok(()) => self.on_fullscreen_change(wanted),
            Err(e) => log::error!(
                "Error attempting to {} fullscreen: {}",
                if wanted { "enable" } else { "exit" },
                e
            ),
        }
    }

    /// Fullscreen notification from the platform. Always wins.
    pub fn on_fullscreen_change(&mut self, fullscreen: bool) {
        if self.is_fullscreen != fullscreen {
            self.is_fullscreen = fullscreen;
            self.events.push(NavigationEvent::FullscreenChanged(fullscreen));
        }
    }

    pub fn toggle_thumbnails(&mut self) {
        self.show_thumbnails = !self.show_thumbnails;
    }

    pub fn toggle_toc(&mut self) {
        self.show_toc = !self.show_toc;
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.is_focused = focused;
    }

    /// Mark that the next click should be swallowed (document hidden or blurred).
    pub fn request_stabilization(&mut self) {
        self.needs_stabilization = true;
    }

    pub fn stabilize(&mut self) {
        self.needs_stabilization = false;
    }

    // ------------------------------------------------------------------
    // Zoom and pan
    // ------------------------------------------------------------------

    pub fn set_zoom(&mut self, level: f32) {
        let level = clamp_zoom(level);
        if (level - self.zoom_level).abs() > f32::EPSILON {
            self.zoom_level = level;
            self.events.push(NavigationEvent::ZoomChanged(level));
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom_level + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom_level - ZOOM_STEP);
    }

    /// Back to 100% and no pan.
    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
        self.pan_offset = PanOffset::ZERO;
    }

    /// Unconstrained; the pan gesture clamps before calling.
    pub fn set_pan_offset(&mut self, offset: PanOffset) {
        self.pan_offset = offset;
    }

    /// Catalog size changed (e.g. after a reload). Keeps the current page if
    /// still valid.
    pub fn set_total_pages(&mut self, total_pages: usize) {
        self.total_pages = total_pages;
        if self.current_page >= total_pages {
            self.set_page(total_pages.saturating_sub(1));
        }
    }
}
