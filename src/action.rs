//! Actions the input adapters produce and the viewer executes.

/// A single request against the viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerAction {
    NextPage,
    PreviousPage,
    /// Animated walk back to the first page.
    FirstPage,
    /// Animated walk forward to the last page.
    LastPage,
    /// Go straight to a zero-based page index.
    GoToPage(usize),
    ToggleAutoPlay,
    ToggleFullscreen,
    /// Leave fullscreen; ignored when not fullscreen.
    ExitFullscreen,
    ToggleThumbnails,
    ToggleToc,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    SetZoom(f32),
    /// Reset a page whose image failed so it loads again.
    RetryPage(usize),
}

impl ViewerAction {
    /// Whether the action moves between pages.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            ViewerAction::NextPage
                | ViewerAction::PreviousPage
                | ViewerAction::FirstPage
                | ViewerAction::LastPage
                | ViewerAction::GoToPage(_)
        )
    }
}
