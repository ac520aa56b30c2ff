//! Hotspot overlay: pixel layout, hit testing, and activation of clickable regions.

use crate::links::{is_absolute, is_same_origin, path_and_query, search_url};
use crate::model::Hotspot;

/// Overlays stack above the page image and its badges.
const OVERLAY_Z_BASE: i32 = 10;

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

/// Box an image of `natural` size occupies when fitted (contain) into `container`,
/// centred on both axes.
pub fn fit_image(container: Rect, natural: (u32, u32)) -> Rect {
    let (nw, nh) = (natural.0 as f32, natural.1 as f32);
    if nw <= 0.0 || nh <= 0.0 || container.width <= 0.0 || container.height <= 0.0 {
        return Rect::new(container.x, container.y, 0.0, 0.0);
    }
    let scale = (container.width / nw).min(container.height / nh);
    let (width, height) = (nw * scale, nh * scale);
    Rect::new(
        container.x + (container.width - width) / 2.0,
        container.y + (container.height - height) / 2.0,
        width,
        height,
    )
}

/// One clickable region, positioned over the rendered image.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotRegion {
    /// Index of the hotspot within its page.
    pub index: usize,
    pub id: String,
    pub rect: Rect,
    /// Stacking order of the overlay element.
    pub z: i32,
    pub title: Option<String>,
}

/// Lay out the active hotspots of a page over `image_box`.
///
/// Inert hotspots (no link, no SKU) are skipped. Regions come back in paint order:
/// ascending z, ties keep their page order.
pub fn layout(hotspots: &[Hotspot], image_box: Rect) -> Vec<HotspotRegion> {
    let mut regions: Vec<HotspotRegion> = hotspots
        .iter()
        .enumerate()
        .filter(|(_, h)| h.is_active())
        .map(|(index, h)| HotspotRegion {
            index,
            id: h.id.clone(),
            rect: Rect::new(
                image_box.x + image_box.width * h.x / 100.0,
                image_box.y + image_box.height * h.y / 100.0,
                image_box.width * h.width / 100.0,
                image_box.height * h.height / 100.0,
            ),
            z: h.z() + OVERLAY_Z_BASE,
            title: region_title(h),
        })
        .collect();
    regions.sort_by_key(|r| r.z);
    regions
}

/// Tooltip: the label, else "View {sku}".
fn region_title(hotspot: &Hotspot) -> Option<String> {
    match hotspot.label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => Some(label.to_string()),
        _ => hotspot.sku().map(|sku| format!("View {}", sku)),
    }
}

/// Topmost region under the point, if any.
pub fn hit_test(regions: &[HotspotRegion], px: f32, py: f32) -> Option<&HotspotRegion> {
    regions.iter().rev().find(|r| r.rect.contains(px, py))
}

/// What a pointer event should do after the overlay has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// The event landed on a hotspot; gestures underneath must not see it.
    StopPropagation,
    Continue,
}

pub fn pointer_disposition(regions: &[HotspotRegion], px: f32, py: f32) -> EventDisposition {
    if hit_test(regions, px, py).is_some() {
        EventDisposition::StopPropagation
    } else {
        EventDisposition::Continue
    }
}

/// Navigation produced by activating a hotspot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotspotAction {
    /// Same-origin target, navigated in place. Holds path, query and fragment.
    NavigateInternal(String),
    OpenExternal(String),
    /// Product search for a SKU-only hotspot.
    NavigateSearch(String),
}

/// Resolve what activating `hotspot` does on a page at `current_url`.
pub fn activate(hotspot: &Hotspot, current_url: &str, search_path: &str) -> Option<HotspotAction> {
    if let Some(link) = hotspot.link() {
        let action = if is_same_origin(link, current_url) {
            HotspotAction::NavigateInternal(path_and_query(link).to_string())
        } else if is_absolute(link) || link.starts_with("//") {
            HotspotAction::OpenExternal(link.to_string())
        } else {
            HotspotAction::NavigateInternal(link.to_string())
        };
        return Some(action);
    }
    hotspot
        .sku()
        .map(|sku| HotspotAction::NavigateSearch(search_url(search_path, sku)))
}
