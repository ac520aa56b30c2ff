//! Error types for the flipbook viewer.

use thiserror::Error;

use crate::config::ConfigError;

/// Failure to obtain a catalog from the page data provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server responded with HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid catalog data: {0}")]
    Json(String),

    #[error("Catalog has no pages")]
    Empty,
}

impl From<flipbook_cache::NetError> for ProviderError {
    fn from(e: flipbook_cache::NetError) -> Self {
        ProviderError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Json(e.to_string())
    }
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum FlipbookError {
    #[error("Failed to load catalog: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to decode image {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] flipbook_cache::CacheError),

    #[error("Host platform error: {0}")]
    Host(String),

    #[error("Failed to start background worker: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, FlipbookError>;
