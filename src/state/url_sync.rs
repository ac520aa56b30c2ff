//! Keeps the `page` query parameter and the current page in step.

use crate::host::Host;
use crate::links;

/// 0-based starting page: the URL's `page` value when numeric and within
/// `1..=total_pages`, else `fallback`.
pub fn initial_page_from_url(url: &str, total_pages: usize, fallback: usize) -> usize {
    match links::page_number_from_url(url) {
        Some(page) if page >= 1 && page <= total_pages => page - 1,
        _ => fallback,
    }
}

/// Writes the current page back into the host URL whenever it changes.
#[derive(Debug, Clone)]
pub struct UrlSync {
    enabled: bool,
    last_synced: Option<usize>,
}

impl UrlSync {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_synced: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Seed the starting page from the host URL (when enabled).
    pub fn initial_page<H: Host + ?Sized>(&self, host: &H, total_pages: usize, fallback: usize) -> usize {
        if self.enabled {
            initial_page_from_url(&host.current_url(), total_pages, fallback)
        } else {
            fallback
        }
    }

    /// Replace the URL so it shows `current_page + 1`. Returns whether the URL
    /// was rewritten.
    pub fn sync<H: Host + ?Sized>(&mut self, host: &mut H, current_page: usize) -> bool {
        if !self.enabled || self.last_synced == Some(current_page) {
            return false;
        }
        let url = links::url_with_page(&host.current_url(), current_page + 1);
        host.replace_url(&url);
        self.last_synced = Some(current_page);
        true
    }

    /// Forget the last written page so the next `sync` rewrites the URL.
    pub fn reset(&mut self) {
        self.last_synced = None;
    }
}
