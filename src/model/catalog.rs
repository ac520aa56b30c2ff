//! Catalog and page data models.

use serde::{Deserialize, Serialize};

use super::{Hotspot, deserialize_id};

/// One page of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    /// 1-based page number. Catalogs may skip numbers.
    #[serde(default)]
    pub page_number: u32,
    pub image_url: String,
    #[serde(default, deserialize_with = "deserialize_hotspots")]
    pub hotspots: Vec<Hotspot>,
}

fn deserialize_hotspots<'de, D>(deserializer: D) -> Result<Vec<Hotspot>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Hotspot>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Page {
    pub fn new(page_number: u32, image_url: impl Into<String>) -> Self {
        Self {
            id: format!("page-{}", page_number),
            page_number,
            image_url: image_url.into(),
            hotspots: Vec::new(),
        }
    }

    pub fn with_hotspot(mut self, hotspot: Hotspot) -> Self {
        self.hotspots.push(hotspot);
        self
    }
}

/// A table-of-contents entry pointing at a 0-based page index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    pub title: String,
    pub page_index: usize,
    #[serde(default)]
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, page_index: usize) -> Self {
        Self {
            title: title.into(),
            page_index,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: TocEntry) -> Self {
        self.children.push(child);
        self
    }
}

/// A read-only catalog as handed out by the page data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
}

impl Catalog {
    pub fn new(id: impl Into<String>, title: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            pages,
            toc: Vec::new(),
        }
    }

    /// Make a freshly fetched catalog usable by the viewer.
    ///
    /// Pages are sorted by page number (stable for duplicates), image URLs are
    /// resolved against `api_url`, and hotspots are clamped into their page.
    pub fn normalized(mut self, api_url: &str) -> Self {
        self.pages.sort_by_key(|p| p.page_number);
        for page in &mut self.pages {
            if let Some(url) = flipbook_cache::resolve_url(api_url, &page.image_url) {
                page.image_url = url;
            }
            page.hotspots = std::mem::take(&mut page.hotspots)
                .into_iter()
                .map(Hotspot::clamped)
                .collect();
        }
        self
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn image_url(&self, index: usize) -> Option<&str> {
        self.pages.get(index).map(|p| p.image_url.as_str())
    }

    /// Page numbers in navigation order.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|p| p.page_number).collect()
    }

    /// Table of contents, or a single cover entry when the catalog has none.
    pub fn toc_or_default(&self) -> Vec<TocEntry> {
        if self.toc.is_empty() {
            vec![TocEntry::new("Cover", 0)]
        } else {
            self.toc.clone()
        }
    }

    /// Accessible description of a page image.
    pub fn alt_text(&self, index: usize) -> String {
        match (index, self.pages.get(index)) {
            (0, _) => self
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| self.title.clone()),
            (_, Some(page)) => format!("Page {}", page.page_number),
            (_, None) => String::new(),
        }
    }
}
