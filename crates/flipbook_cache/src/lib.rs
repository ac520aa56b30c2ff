//! Persistent cache coordinator for flipbook page images and API responses.
//!
//! A [`CacheCoordinator`] is a long-lived service with its own thread. It serves page
//! images cache-first, API calls stale-while-revalidate, and accepts the
//! [`CacheCommand`] protocol for pre-fetching, clearing and status queries.

pub mod coordinator;
pub mod error;
pub mod net;
pub mod protocol;
pub mod store;
pub mod strategy;

pub use coordinator::{CacheCoordinator, CacheHandle, CoordinatorConfig, DEFAULT_CACHE_VERSION};
pub use error::{CacheError, NetError, Result};
#[cfg(not(target_arch = "wasm32"))]
pub use net::UreqFetcher;
pub use net::{resolve_url, Fetcher, HttpResponse, MemoryFetcher};
pub use protocol::{CacheCommand, CacheReply, CacheStatus};
#[cfg(not(target_arch = "wasm32"))]
pub use store::DiskStore;
pub use store::{CacheStore, CachedResponse, MemoryStore};
pub use strategy::RequestKind;
