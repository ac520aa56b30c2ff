use thiserror::Error;

/// Transport-level failure while talking to the network.
#[derive(Debug, Clone, Error)]
#[error("network error for {url}: {message}")]
pub struct NetError {
    pub url: String,
    pub message: String,
}

impl NetError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache storage unavailable: {0}")]
    Storage(String),

    #[error("Cache coordinator is not running")]
    Disconnected,

    #[error("Cache coordinator did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Failed to spawn cache coordinator: {0}")]
    Spawn(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
