//! Message protocol between the foreground and the cache coordinator.
//!
//! ## Wire format
//!
//! Foreground → coordinator:
//! ```json
//! { "type": "CACHE_FLIPBOOK_PAGES", "payload": { "pages": ["https://…/1.jpg"] } }
//! { "type": "PRECACHE_FIRST_PAGES", "payload": { "apiUrl": "…", "flipbookId": "…", "count": 3 } }
//! { "type": "CLEAR_CACHE" }
//! { "type": "GET_CACHE_STATUS" }
//! ```
//!
//! Coordinator → foreground:
//! ```json
//! { "type": "CACHE_STATUS", "payload": { "flipbook-v2-flipbook": 12, "flipbook-v2-api": 3 } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Commands accepted by the coordinator. All of them are fire-and-forget except
/// `GetCacheStatus`, which is answered with [`CacheReply::CacheStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheCommand {
    /// Fetch and store these page-image URLs now.
    CacheFlipbookPages { pages: Vec<String> },
    /// Resolve a catalog's page list and cache its first `count` images.
    PrecacheFirstPages {
        #[serde(rename = "apiUrl")]
        api_url: String,
        #[serde(rename = "flipbookId")]
        flipbook_id: String,
        count: usize,
    },
    /// Drop every bucket.
    ClearCache,
    /// Ask for entry counts per bucket.
    GetCacheStatus,
}

/// Entry counts keyed by bucket name.
pub type CacheStatus = BTreeMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheReply {
    CacheStatus(CacheStatus),
}

impl CacheCommand {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            CacheCommand::CacheFlipbookPages { .. } => "CACHE_FLIPBOOK_PAGES",
            CacheCommand::PrecacheFirstPages { .. } => "PRECACHE_FIRST_PAGES",
            CacheCommand::ClearCache => "CLEAR_CACHE",
            CacheCommand::GetCacheStatus => "GET_CACHE_STATUS",
        }
    }
}

impl CacheReply {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_foreground_messages() {
        let cmd = CacheCommand::from_json(
            r#"{"type":"CACHE_FLIPBOOK_PAGES","payload":{"pages":["http://a/1.jpg","http://a/2.jpg"]}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            CacheCommand::CacheFlipbookPages {
                pages: vec!["http://a/1.jpg".to_string(), "http://a/2.jpg".to_string()]
            }
        );

        let cmd = CacheCommand::from_json(
            r#"{"type":"PRECACHE_FIRST_PAGES","payload":{"apiUrl":"http://api","flipbookId":"fb-1","count":5}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            CacheCommand::PrecacheFirstPages {
                api_url: "http://api".to_string(),
                flipbook_id: "fb-1".to_string(),
                count: 5
            }
        );

        assert_eq!(
            CacheCommand::from_json(r#"{"type":"CLEAR_CACHE"}"#).unwrap(),
            CacheCommand::ClearCache
        );
        assert_eq!(
            CacheCommand::from_json(r#"{"type":"GET_CACHE_STATUS"}"#).unwrap(),
            CacheCommand::GetCacheStatus
        );
    }

    #[test]
    fn test_unknown_message_is_rejected() {
        assert!(CacheCommand::from_json(r#"{"type":"SKIP_WAITING"}"#).is_err());
    }

    #[test]
    fn test_status_reply_shape() {
        let mut status = CacheStatus::new();
        status.insert("flipbook-v2-flipbook".to_string(), 2);
        let json = CacheReply::CacheStatus(status).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"CACHE_STATUS","payload":{"flipbook-v2-flipbook":2}}"#
        );
    }
}
