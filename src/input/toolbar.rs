//! Toolbar and zoom controls.

use crate::action::ViewerAction;
use crate::constants::{MAX_ZOOM, MIN_ZOOM};
use crate::state::NavigationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarButton {
    First,
    Previous,
    Next,
    Last,
    AutoPlay,
    Thumbnails,
    Toc,
    Fullscreen,
    ZoomOut,
    ZoomIn,
    ResetZoom,
}

impl ToolbarButton {
    pub fn action(self) -> ViewerAction {
        match self {
            ToolbarButton::First => ViewerAction::FirstPage,
            ToolbarButton::Previous => ViewerAction::PreviousPage,
            ToolbarButton::Next => ViewerAction::NextPage,
            ToolbarButton::Last => ViewerAction::LastPage,
            ToolbarButton::AutoPlay => ViewerAction::ToggleAutoPlay,
            ToolbarButton::Thumbnails => ViewerAction::ToggleThumbnails,
            ToolbarButton::Toc => ViewerAction::ToggleToc,
            ToolbarButton::Fullscreen => ViewerAction::ToggleFullscreen,
            ToolbarButton::ZoomOut => ViewerAction::ZoomOut,
            ToolbarButton::ZoomIn => ViewerAction::ZoomIn,
            ToolbarButton::ResetZoom => ViewerAction::ResetZoom,
        }
    }
}

/// One rendered button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarItem {
    pub button: ToolbarButton,
    pub enabled: bool,
    /// Toggle buttons render pressed while their mode is on.
    pub active: bool,
    /// Tooltip, with the keyboard shortcut.
    pub title: &'static str,
}

/// Which optional toggles the toolbar carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolbarOptions {
    pub thumbnails_toggle: bool,
    pub toc_toggle: bool,
}

/// Toolbar derived from the navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolbar {
    pub items: Vec<ToolbarItem>,
    /// "n / total"
    pub indicator: String,
    /// "NNN%"
    pub zoom_label: String,
}

impl Toolbar {
    pub fn build(state: &NavigationState, options: ToolbarOptions) -> Self {
        let first = state.is_first_page();
        let last = state.is_last_page();
        let zoom = state.zoom_level();

        let item = |button, enabled, active, title| ToolbarItem {
            button,
            enabled,
            active,
            title,
        };

        let mut items = vec![
            item(ToolbarButton::First, !first, false, "First page (Home)"),
            item(
                ToolbarButton::Previous,
                !first,
                false,
                "Previous page (Left arrow)",
            ),
            item(ToolbarButton::Next, !last, false, "Next page (Right arrow)"),
            item(ToolbarButton::Last, !last, false, "Last page (End)"),
            item(
                ToolbarButton::AutoPlay,
                true,
                state.is_playing(),
                if state.is_playing() {
                    "Pause"
                } else {
                    "Auto-play"
                },
            ),
        ];
        if options.thumbnails_toggle {
            items.push(item(
                ToolbarButton::Thumbnails,
                true,
                state.show_thumbnails(),
                "Show thumbnails",
            ));
        }
        if options.toc_toggle {
            items.push(item(
                ToolbarButton::Toc,
                true,
                state.show_toc(),
                "Table of contents",
            ));
        }
        items.push(item(
            ToolbarButton::Fullscreen,
            true,
            state.is_fullscreen(),
            if state.is_fullscreen() {
                "Exit fullscreen (Esc)"
            } else {
                "Fullscreen (F)"
            },
        ));
        items.push(item(
            ToolbarButton::ZoomOut,
            zoom > MIN_ZOOM,
            false,
            "Zoom out (-)",
        ));
        items.push(item(ToolbarButton::ZoomIn, zoom < MAX_ZOOM, false, "Zoom in (+)"));
        items.push(item(
            ToolbarButton::ResetZoom,
            zoom != 1.0,
            false,
            "Reset zoom (0)",
        ));

        Self {
            items,
            indicator: page_indicator(state.current_page(), state.total_pages()),
            zoom_label: zoom_label(zoom),
        }
    }

    pub fn item(&self, button: ToolbarButton) -> Option<&ToolbarItem> {
        self.items.iter().find(|i| i.button == button)
    }

    /// Action for a click on `button`, `None` when it is disabled or absent.
    pub fn click(&self, button: ToolbarButton) -> Option<ViewerAction> {
        self.item(button)
            .filter(|i| i.enabled)
            .map(|i| i.button.action())
    }
}

pub fn page_indicator(current: usize, total: usize) -> String {
    if total == 0 {
        return "0 / 0".to_string();
    }
    format!("{} / {}", current + 1, total)
}

pub fn zoom_label(zoom: f32) -> String {
    format!("{}%", (zoom * 100.0).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_rules_at_bounds() {
        let state = NavigationState::new(5, 0);
        let toolbar = Toolbar::build(&state, ToolbarOptions::default());
        assert!(!toolbar.item(ToolbarButton::First).unwrap().enabled);
        assert!(!toolbar.item(ToolbarButton::Previous).unwrap().enabled);
        assert!(toolbar.item(ToolbarButton::Next).unwrap().enabled);
        assert!(!toolbar.item(ToolbarButton::ResetZoom).unwrap().enabled);
        assert_eq!(toolbar.click(ToolbarButton::Previous), None);
        assert_eq!(toolbar.click(ToolbarButton::Next), Some(ViewerAction::NextPage));
        assert_eq!(toolbar.indicator, "1 / 5");
        assert_eq!(toolbar.zoom_label, "100%");

        let mut state = NavigationState::new(5, 4);
        state.set_zoom(3.0);
        let toolbar = Toolbar::build(&state, ToolbarOptions::default());
        assert!(!toolbar.item(ToolbarButton::Last).unwrap().enabled);
        assert!(!toolbar.item(ToolbarButton::ZoomIn).unwrap().enabled);
        assert!(toolbar.item(ToolbarButton::ZoomOut).unwrap().enabled);
        assert_eq!(toolbar.indicator, "5 / 5");
        assert_eq!(toolbar.zoom_label, "300%");
    }

    #[test]
    fn test_optional_toggles() {
        let state = NavigationState::new(3, 0);
        let bare = Toolbar::build(&state, ToolbarOptions::default());
        assert!(bare.item(ToolbarButton::Thumbnails).is_none());
        assert!(bare.item(ToolbarButton::Toc).is_none());

        let full = Toolbar::build(
            &state,
            ToolbarOptions {
                thumbnails_toggle: true,
                toc_toggle: true,
            },
        );
        assert_eq!(
            full.click(ToolbarButton::Toc),
            Some(ViewerAction::ToggleToc)
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(zoom_label(1.25), "125%");
        assert_eq!(zoom_label(0.5), "50%");
        assert_eq!(page_indicator(0, 0), "0 / 0");
    }
}
