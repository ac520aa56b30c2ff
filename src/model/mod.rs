//! Data models for the flipbook viewer.

mod catalog;
mod hotspot;

pub use catalog::{Catalog, Page, TocEntry};
pub use hotspot::Hotspot;

use serde::{Deserialize, Deserializer};

/// Accept ids sent either as JSON strings or numbers. Missing or null becomes empty.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(text)) => text,
        Some(RawId::Number(number)) => number.to_string(),
        None => String::new(),
    })
}
