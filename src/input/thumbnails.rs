//! Thumbnail strip.

use std::ops::Range;

use crate::action::ViewerAction;
use crate::constants::THUMBNAIL_WINDOW;
use crate::model::Catalog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub index: usize,
    pub page_number: u32,
    pub image_url: String,
    pub active: bool,
}

/// Strip with one thumbnail per page, scrolled so the current page sits in the middle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailStrip {
    window: usize,
}

impl Default for ThumbnailStrip {
    fn default() -> Self {
        Self::new(THUMBNAIL_WINDOW)
    }
}

impl ThumbnailStrip {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Indices in view, centred on `current` and shifted inwards at the ends.
    pub fn window(&self, current: usize, total: usize) -> Range<usize> {
        if total <= self.window {
            return 0..total;
        }
        let half = self.window / 2;
        let start = current.saturating_sub(half).min(total - self.window);
        start..start + self.window
    }

    /// Thumbnails in view.
    pub fn items(&self, catalog: &Catalog, current: usize) -> Vec<Thumbnail> {
        self.window(current, catalog.len())
            .filter_map(|index| {
                catalog.page(index).map(|page| Thumbnail {
                    index,
                    page_number: page.page_number,
                    image_url: page.image_url.clone(),
                    active: index == current,
                })
            })
            .collect()
    }

    pub fn select(&self, index: usize) -> ViewerAction {
        ViewerAction::GoToPage(index)
    }
}
