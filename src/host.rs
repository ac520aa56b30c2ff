//! Host platform adapter: URL bar, fullscreen, and navigation.

use crate::error::{FlipbookError, Result};

/// Platform services the viewer needs from whatever embeds it.
pub trait Host {
    /// Full URL of the hosting page.
    fn current_url(&self) -> String;

    /// Rewrite the URL in place without adding a history entry.
    fn replace_url(&mut self, url: &str);

    /// Ask the platform to enter or leave fullscreen. The platform may refuse.
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()>;

    /// Navigate within the app, in the same browsing context.
    fn navigate(&mut self, url: &str);

    /// Open `url` in a new browsing context.
    fn open_new_context(&mut self, url: &str);
}

/// In-memory host that records everything asked of it.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    pub url: String,
    pub fullscreen: bool,
    /// When true, fullscreen requests fail.
    pub refuse_fullscreen: bool,
    pub url_replacements: usize,
    pub navigations: Vec<String>,
    pub opened: Vec<String>,
}

impl MemoryHost {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Host for MemoryHost {
    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn replace_url(&mut self, url: &str) {
        self.url = url.to_string();
        self.url_replacements += 1;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        if self.refuse_fullscreen {
            return Err(FlipbookError::Host("fullscreen not allowed".to_string()));
        }
        self.fullscreen = fullscreen;
        Ok(())
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
    }

    fn open_new_context(&mut self, url: &str) {
        self.opened.push(url.to_string());
    }
}
