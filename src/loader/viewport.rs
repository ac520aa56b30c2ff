//! Viewport-driven visibility: pages count as visible slightly before they scroll
//! or flip into view.

use std::collections::BTreeSet;

use crate::constants::VIEWPORT_ROOT_MARGIN;

/// Vertical extent of one page element, in the same units as the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub index: usize,
    pub top: f32,
    pub height: f32,
}

impl PageBox {
    pub fn new(index: usize, top: f32, height: f32) -> Self {
        Self { index, top, height }
    }
}

/// Tracks which pages intersect the viewport expanded by a root margin.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    /// Fraction of the viewport height added above and below.
    root_margin: f32,
    buffer: usize,
    visible: BTreeSet<usize>,
}

impl ViewportTracker {
    pub fn new(buffer: usize) -> Self {
        Self {
            root_margin: VIEWPORT_ROOT_MARGIN,
            buffer,
            visible: BTreeSet::new(),
        }
    }

    pub fn with_root_margin(mut self, margin: f32) -> Self {
        self.root_margin = margin.max(0.0);
        self
    }

    pub fn visible(&self) -> &BTreeSet<usize> {
        &self.visible
    }

    /// Recompute visibility for the given layout.
    ///
    /// Intersecting pages are added. Pages that stopped intersecting are dropped
    /// unless they are still within the buffer radius of `current_page`.
    pub fn observe(
        &mut self,
        viewport_top: f32,
        viewport_height: f32,
        boxes: &[PageBox],
        current_page: usize,
    ) -> &BTreeSet<usize> {
        let margin = viewport_height * self.root_margin;
        let low = viewport_top - margin;
        let high = viewport_top + viewport_height + margin;

        for page in boxes {
            let intersects = page.top + page.height > low && page.top < high;
            if intersects {
                self.visible.insert(page.index);
            } else if page.index.abs_diff(current_page) > self.buffer {
                self.visible.remove(&page.index);
            }
        }
        &self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacked(count: usize, height: f32) -> Vec<PageBox> {
        (0..count)
            .map(|i| PageBox::new(i, i as f32 * height, height))
            .collect()
    }

    #[test]
    fn test_root_margin_loads_ahead() {
        let boxes = stacked(10, 1000.0);
        let mut tracker = ViewportTracker::new(0);

        // Viewport shows page 2 only; 50% margin reaches into pages 1 and 3.
        let visible = tracker.observe(2000.0, 1000.0, &boxes, 2).clone();
        assert_eq!(visible, [1, 2, 3].into_iter().collect());
    }

    #[test]
    fn test_buffer_keeps_recent_pages() {
        let boxes = stacked(10, 1000.0);
        let mut tracker = ViewportTracker::new(1).with_root_margin(0.0);

        tracker.observe(0.0, 1000.0, &boxes, 0);
        tracker.observe(1000.0, 1000.0, &boxes, 1);
        let visible = tracker.observe(5000.0, 1000.0, &boxes, 5).clone();

        // Page 0 and 1 are far from page 5 and leave; page 5 enters.
        assert_eq!(visible, [5].into_iter().collect());

        let visible = tracker.observe(6000.0, 1000.0, &boxes, 6).clone();
        assert_eq!(visible, [5, 6].into_iter().collect());
    }
}
