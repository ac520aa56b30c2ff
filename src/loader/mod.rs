//! Page image loading: the lazy render window, viewport tracking, the catalog
//! request and the background preload worker.
//!
//! Native builds fetch on threads. The browser build fetches with `spawn_local`
//! through the Cache API; both report back through the same polled types.

mod catalog_request;
mod decode;
mod lazy;
#[cfg(not(target_arch = "wasm32"))]
mod preload_worker;
mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web_fetch;
#[cfg(target_arch = "wasm32")]
mod web_preload;

pub use catalog_request::{CatalogRequest, CatalogResult};
pub use decode::{DecodedPage, check_response, decode_page, read_dimensions};
#[cfg(not(target_arch = "wasm32"))]
pub use decode::fetch_page;
pub use lazy::{LazyPageLoader, PageLoadState, PageRender};
#[cfg(not(target_arch = "wasm32"))]
pub use preload_worker::PreloadWorker;
pub use viewport::{PageBox, ViewportTracker};
#[cfg(target_arch = "wasm32")]
pub use web_preload::PreloadWorker;

#[cfg(test)]
pub(crate) use decode::png_bytes;

use crate::constants::{PROGRESS_DATA_FETCHED, PROGRESS_IMAGES_DONE, PROGRESS_READY};

/// Result messages sent back from the preload worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadEvent {
    Loaded { url: String, width: u32, height: u32 },
    Error { url: String, error: String },
    Progress { loaded: usize, total: usize },
}

/// Progress of the whole viewer load sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    FetchingData,
    PreloadingImages { loaded: usize, total: usize },
    Ready,
    Error(String),
}

impl LoadPhase {
    /// Progress in percent (0-100).
    pub fn progress(&self) -> u8 {
        match self {
            LoadPhase::Idle | LoadPhase::Error(_) => 0,
            LoadPhase::FetchingData => PROGRESS_DATA_FETCHED,
            LoadPhase::PreloadingImages { loaded, total } => {
                if *total == 0 {
                    return PROGRESS_IMAGES_DONE;
                }
                let span = (PROGRESS_IMAGES_DONE - PROGRESS_DATA_FETCHED) as usize;
                let done = (*loaded).min(*total) * span / *total;
                PROGRESS_DATA_FETCHED + done as u8
            }
            LoadPhase::Ready => PROGRESS_READY,
        }
    }

    /// Text shown next to the progress bar.
    pub fn status_text(&self) -> String {
        match self {
            LoadPhase::Idle => String::new(),
            LoadPhase::FetchingData => "Loading catalog...".to_string(),
            LoadPhase::PreloadingImages { loaded, total } => {
                format!("Loading pages {}/{}", loaded, total)
            }
            LoadPhase::Ready => "Ready".to_string(),
            LoadPhase::Error(message) => format!("Failed to load catalog: {}", message),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadPhase::Ready)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadPhase::Error(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            LoadPhase::FetchingData | LoadPhase::PreloadingImages { .. }
        )
    }
}
