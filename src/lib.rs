//! Flipbook - catalog page-flip viewer engine
//!
//! Loads a storefront catalog, pages through it with a flip animation engine, keeps
//! the page in the URL, and lays out clickable product hotspots over each page.
//! Page images and API responses go through the `flipbook_cache` coordinator.

pub mod action;
pub mod config;
pub mod constants;
pub mod error;
pub mod flip;
pub mod host;
pub mod input;
pub mod links;
pub mod loader;
pub mod logging;
pub mod model;
pub mod overlay;
pub mod provider;
pub mod state;
pub mod viewer;

pub use action::ViewerAction;
pub use config::{AppConfig, ConfigError, LogLevel, ViewerConfig};
pub use error::{FlipbookError, ProviderError, Result};
pub use flip::{PageFlipEngine, RecordingFlipEngine};
pub use host::{Host, MemoryHost};
pub use loader::LoadPhase;
pub use model::{Catalog, Hotspot, Page, TocEntry};
pub use provider::{HttpPageDataProvider, PageDataProvider, StaticPageDataProvider};
pub use state::{NavigationEvent, NavigationState};
pub use viewer::{ClickOutcome, Viewer};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
