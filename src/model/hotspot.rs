//! Hotspot data model: a clickable rectangle on a page image.

use serde::{Deserialize, Serialize};

use super::deserialize_id;

/// A percentage-positioned clickable region on a page.
///
/// Coordinates are percentages (0-100) of the page image. After [`Hotspot::clamped`]
/// the rectangle lies fully inside the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub product_sku: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub z_index: Option<i32>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Hotspot {
    /// Create a hotspot at the given percentage rectangle with no target.
    pub fn new(id: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            label: None,
            product_sku: None,
            link_url: None,
            z_index: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link_url = Some(link.into());
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.product_sku = Some(sku.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    /// Link target, if set and not blank.
    pub fn link(&self) -> Option<&str> {
        non_empty(&self.link_url)
    }

    /// Product SKU, if set and not blank.
    pub fn sku(&self) -> Option<&str> {
        non_empty(&self.product_sku)
    }

    /// A hotspot with neither link nor SKU has nothing to activate.
    pub fn is_active(&self) -> bool {
        self.link().is_some() || self.sku().is_some()
    }

    /// Tooltip text: the label, else the SKU.
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.label).or_else(|| self.sku())
    }

    pub fn z(&self) -> i32 {
        self.z_index.unwrap_or(0)
    }

    /// Pull the rectangle inside the page: origin in `[0, 100]`, size shrunk so that
    /// `x + width <= 100` and `y + height <= 100`.
    pub fn clamped(mut self) -> Self {
        let fix = |v: f32| if v.is_finite() { v } else { 0.0 };
        self.x = fix(self.x).clamp(0.0, 100.0);
        self.y = fix(self.y).clamp(0.0, 100.0);
        self.width = fix(self.width).clamp(0.0, 100.0 - self.x);
        self.height = fix(self.height).clamp(0.0, 100.0 - self.y);
        self
    }

    /// Whether a point given in page percentages falls inside the hotspot.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{"id": 42, "x": 10, "y": 20.5, "width": 30, "height": 15,
                       "productSku": "abc123", "linkUrl": "", "zIndex": 2}"#;
        let hotspot: Hotspot = serde_json::from_str(json).unwrap();
        assert_eq!(hotspot.id, "42");
        assert_eq!(hotspot.y, 20.5);
        assert_eq!(hotspot.sku(), Some("abc123"));
        assert_eq!(hotspot.link(), None);
        assert_eq!(hotspot.z(), 2);
        assert!(hotspot.is_active());
    }

    #[test]
    fn test_inert_hotspot() {
        let hotspot = Hotspot::new("h", 0.0, 0.0, 10.0, 10.0).with_label("Just a label");
        assert!(!hotspot.is_active());
        assert_eq!(hotspot.title(), Some("Just a label"));
    }

    #[test]
    fn test_clamp_into_page() {
        let hotspot = Hotspot::new("h", 90.0, -5.0, 30.0, 120.0).clamped();
        assert_eq!(hotspot.x, 90.0);
        assert_eq!(hotspot.width, 10.0);
        assert_eq!(hotspot.y, 0.0);
        assert_eq!(hotspot.height, 100.0);

        let hotspot = Hotspot::new("h", f32::NAN, 150.0, -3.0, 5.0).clamped();
        assert_eq!(hotspot.x, 0.0);
        assert_eq!(hotspot.y, 100.0);
        assert_eq!(hotspot.width, 0.0);
        assert_eq!(hotspot.height, 0.0);
    }

    #[test]
    fn test_contains() {
        let hotspot = Hotspot::new("h", 10.0, 10.0, 20.0, 20.0);
        assert!(hotspot.contains(10.0, 30.0));
        assert!(hotspot.contains(20.0, 20.0));
        assert!(!hotspot.contains(31.0, 20.0));
    }
}
