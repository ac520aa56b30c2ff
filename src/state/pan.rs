//! Drag-to-pan gesture while zoomed in.

use super::navigation::PanOffset;

/// Pointer drag state for panning a zoomed page.
///
/// Mirrors the image viewer drag handling: `start_drag` / `update_drag` /
/// `end_drag`. Offsets are constrained so the zoomed page never leaves its container.
#[derive(Debug, Clone, Default)]
pub struct PanGesture {
    is_dragging: bool,
    /// Pointer position minus pan offset at drag start.
    drag_origin: Option<(f32, f32)>,
}

/// Largest allowed offset on each axis for a container of the given size.
pub fn max_pan(container: (f32, f32), zoom: f32) -> (f32, f32) {
    let extra = (zoom - 1.0).max(0.0);
    (container.0 * extra / 2.0, container.1 * extra / 2.0)
}

/// Clamp `offset` to the allowed range.
pub fn constrain(offset: PanOffset, container: (f32, f32), zoom: f32) -> PanOffset {
    let (max_x, max_y) = max_pan(container, zoom);
    PanOffset {
        x: offset.x.clamp(-max_x, max_x),
        y: offset.y.clamp(-max_y, max_y),
    }
}

impl PanGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    /// Begin a drag at pointer `pos`. Ignored unless zoomed in.
    pub fn start_drag(&mut self, pos: (f32, f32), current: PanOffset, zoom: f32) -> bool {
        if zoom <= 1.0 {
            return false;
        }
        self.is_dragging = true;
        self.drag_origin = Some((pos.0 - current.x, pos.1 - current.y));
        true
    }

    /// New constrained offset for pointer `pos`, or `None` when not dragging.
    pub fn update_drag(
        &mut self,
        pos: (f32, f32),
        container: (f32, f32),
        zoom: f32,
    ) -> Option<PanOffset> {
        if !self.is_dragging || zoom <= 1.0 {
            return None;
        }
        let origin = self.drag_origin?;
        Some(constrain(
            PanOffset::new(pos.0 - origin.0, pos.1 - origin.1),
            container,
            zoom,
        ))
    }

    /// Release on pointer-up, touch-end, window blur, or document hidden.
    pub fn end_drag(&mut self) {
        self.is_dragging = false;
        self.drag_origin = None;
    }

    /// CSS-style cursor hint.
    pub fn cursor(&self, zoom: f32) -> &'static str {
        match (zoom > 1.0, self.is_dragging) {
            (false, _) => "default",
            (true, true) => "grabbing",
            (true, false) => "grab",
        }
    }
}
