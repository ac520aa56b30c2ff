//! Per-page load tracking and the lazy render decision.

use std::collections::BTreeSet;

use crate::constants::DEFAULT_PRELOAD_PAGES;
use crate::model::Catalog;

/// Load state of one page image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageLoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed(String),
}

/// What to draw for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRender {
    /// Real image element. The page-number badge shows once `loaded`.
    Image {
        url: String,
        page_number: u32,
        loaded: bool,
    },
    /// Fixed-size box with the page number, no image held in memory.
    Placeholder { page_number: u32 },
    /// The image could not be fetched or decoded.
    Failed { page_number: u32 },
}

/// Decides which pages get real images.
///
/// A page is rendered when it lies within `preload_pages` of the current page, when
/// the viewport tracker reports it visible, or when it has loaded once before.
/// Loaded pages are never dropped again.
#[derive(Debug, Clone)]
pub struct LazyPageLoader {
    preload_pages: usize,
    current_page: usize,
    states: Vec<PageLoadState>,
    /// Natural size of each decoded page image.
    sizes: Vec<Option<(u32, u32)>>,
    /// Extra pages reported visible by the viewport tracker.
    viewport_visible: BTreeSet<usize>,
}

impl Default for LazyPageLoader {
    fn default() -> Self {
        Self::new(0, DEFAULT_PRELOAD_PAGES)
    }
}

impl LazyPageLoader {
    pub fn new(total_pages: usize, preload_pages: usize) -> Self {
        Self {
            preload_pages,
            current_page: 0,
            states: vec![PageLoadState::Unloaded; total_pages],
            sizes: vec![None; total_pages],
            viewport_visible: BTreeSet::new(),
        }
    }

    pub fn total_pages(&self) -> usize {
        self.states.len()
    }

    pub fn preload_pages(&self) -> usize {
        self.preload_pages
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Within the buffer radius of the current page.
    pub fn in_buffer(&self, index: usize) -> bool {
        index.abs_diff(self.current_page) <= self.preload_pages
    }

    pub fn should_render_page(&self, index: usize) -> bool {
        index < self.states.len()
            && (self.in_buffer(index)
                || self.viewport_visible.contains(&index)
                || self.is_page_loaded(index))
    }

    pub fn state(&self, index: usize) -> PageLoadState {
        self.states.get(index).cloned().unwrap_or_default()
    }

    pub fn is_page_loaded(&self, index: usize) -> bool {
        matches!(self.states.get(index), Some(PageLoadState::Loaded))
    }

    pub fn page_size(&self, index: usize) -> Option<(u32, u32)> {
        self.sizes.get(index).copied().flatten()
    }

    pub fn loaded_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| matches!(s, PageLoadState::Loaded))
            .count()
    }

    /// Set of pages currently rendered.
    pub fn visible_pages(&self) -> BTreeSet<usize> {
        (0..self.states.len())
            .filter(|&i| self.should_render_page(i))
            .collect()
    }

    /// Move to `current_page` and return the pages that must start loading now,
    /// closest to the current page first. Those pages switch to `Loading`.
    pub fn update(&mut self, current_page: usize) -> Vec<usize> {
        self.current_page = current_page.min(self.states.len().saturating_sub(1));

        let mut due: Vec<usize> = (0..self.states.len())
            .filter(|&i| {
                self.states[i] == PageLoadState::Unloaded && self.should_render_page(i)
            })
            .collect();
        due.sort_by_key(|&i| (i.abs_diff(self.current_page), i));

        for &i in &due {
            self.states[i] = PageLoadState::Loading;
        }
        if !due.is_empty() {
            log::debug!("Loading pages {:?} around page {}", due, self.current_page);
        }
        due
    }

    pub fn mark_loaded(&mut self, index: usize, size: (u32, u32)) {
        if let Some(state) = self.states.get_mut(index) {
            *state = PageLoadState::Loaded;
            self.sizes[index] = Some(size);
        }
    }

    pub fn mark_failed(&mut self, index: usize, reason: impl Into<String>) {
        if let Some(state) = self.states.get_mut(index) {
            let reason = reason.into();
            log::warn!("Page {} failed to load: {}", index + 1, reason);
            *state = PageLoadState::Failed(reason);
        }
    }

    /// Reset a failed page so the next `update` loads it again.
    pub fn retry_page(&mut self, index: usize) -> bool {
        match self.states.get_mut(index) {
            Some(state @ PageLoadState::Failed(_)) => {
                *state = PageLoadState::Unloaded;
                true
            }
            _ => false,
        }
    }

    /// Replace the viewport-visible set (see `ViewportTracker`).
    pub fn set_viewport_visible(&mut self, visible: BTreeSet<usize>) {
        self.viewport_visible = visible;
    }

    /// Pages that were loading are put back to `Unloaded` (worker cancelled).
    pub fn reset_in_flight(&mut self) {
        for state in &mut self.states {
            if *state == PageLoadState::Loading {
                *state = PageLoadState::Unloaded;
            }
        }
    }

    /// What to draw for page `index`.
    pub fn render_plan(&self, catalog: &Catalog, index: usize) -> Option<PageRender> {
        let page = catalog.page(index)?;
        let page_number = page.page_number;
        Some(match self.state(index) {
            PageLoadState::Failed(_) => PageRender::Failed { page_number },
            state if self.should_render_page(index) => PageRender::Image {
                url: page.image_url.clone(),
                page_number,
                loaded: state == PageLoadState::Loaded,
            },
            _ => PageRender::Placeholder { page_number },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Page;

    fn catalog(pages: u32) -> Catalog {
        Catalog::new(
            "c",
            "Catalog",
            (1..=pages)
                .map(|n| Page::new(n, format!("http://h/{}.jpg", n)))
                .collect(),
        )
    }

    #[test]
    fn test_buffer_window() {
        let mut loader = LazyPageLoader::new(20, 3);
        let due = loader.update(10);
        assert_eq!(due, vec![10, 9, 11, 8, 12, 7, 13]);
        assert!(loader.should_render_page(7));
        assert!(!loader.should_render_page(6));
        assert!(!loader.should_render_page(14));
        assert_eq!(loader.state(10), PageLoadState::Loading);
    }

    #[test]
    fn test_loaded_pages_stay_rendered() {
        let mut loader = LazyPageLoader::new(20, 1);
        loader.update(0);
        loader.mark_loaded(1, (600, 800));

        let due = loader.update(10);
        assert_eq!(due, vec![10, 9, 11]);
        assert!(loader.should_render_page(1));
        // Page 0 was still loading when we left: it stays in flight, not rendered.
        assert!(!loader.should_render_page(0));
        assert_eq!(loader.page_size(1), Some((600, 800)));
    }

    #[test]
    fn test_failed_page_and_retry() {
        let cat = catalog(5);
        let mut loader = LazyPageLoader::new(5, 1);
        loader.update(0);
        loader.mark_failed(1, "HTTP 404");

        assert_eq!(
            loader.render_plan(&cat, 1),
            Some(PageRender::Failed { page_number: 2 })
        );
        assert!(loader.update(0).is_empty());

        assert!(loader.retry_page(1));
        assert!(!loader.retry_page(1));
        assert_eq!(loader.update(0), vec![1]);
    }

    #[test]
    fn test_render_plan() {
        let cat = catalog(10);
        let mut loader = LazyPageLoader::new(10, 2);
        loader.update(0);
        loader.mark_loaded(0, (10, 10));

        assert_eq!(
            loader.render_plan(&cat, 0),
            Some(PageRender::Image {
                url: "http://h/1.jpg".to_string(),
                page_number: 1,
                loaded: true
            })
        );
        assert_eq!(
            loader.render_plan(&cat, 1),
            Some(PageRender::Image {
                url: "http://h/2.jpg".to_string(),
                page_number: 2,
                loaded: false
            })
        );
        assert_eq!(
            loader.render_plan(&cat, 5),
            Some(PageRender::Placeholder { page_number: 6 })
        );
        assert_eq!(loader.render_plan(&cat, 10), None);
    }

    #[test]
    fn test_viewport_visible_pages_render() {
        let mut loader = LazyPageLoader::new(10, 0);
        loader.set_viewport_visible([4, 5].into_iter().collect());
        assert_eq!(loader.update(0), vec![0, 4, 5]);
    }
}
