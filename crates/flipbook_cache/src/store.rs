//! Durable key-value storage for cached responses.
//!
//! Entries live in named buckets (one per cache generation and kind, e.g.
//! `flipbook-v2-flipbook`) and are keyed by absolute request URL. A write for a
//! given URL replaces the previous entry as a whole; last writer wins.

use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::io::Write;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::net::HttpResponse;

/// A stored response body with the metadata needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl From<&HttpResponse> for CachedResponse {
    fn from(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            content_type: response.content_type.clone(),
            body: response.body.clone(),
        }
    }
}

impl From<CachedResponse> for HttpResponse {
    fn from(cached: CachedResponse) -> Self {
        HttpResponse {
            status: cached.status,
            content_type: cached.content_type,
            body: cached.body,
        }
    }
}

/// Storage backend shared by every viewer and the coordinator thread.
pub trait CacheStore: Send + Sync {
    /// Names of all existing buckets.
    fn bucket_names(&self) -> Result<Vec<String>>;

    fn get(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>>;

    fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<()>;

    fn entry_count(&self, bucket: &str) -> Result<usize>;

    /// Delete a bucket and everything in it. Returns whether it existed.
    fn delete_bucket(&self, bucket: &str) -> Result<bool>;
}

/// Process-local store. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, HashMap<String, CachedResponse>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, HashMap<String, CachedResponse>>>> {
        self.buckets
            .lock()
            .map_err(|_| CacheError::Storage("memory store lock poisoned".to_string()))
    }
}

impl CacheStore for MemoryStore {
    fn bucket_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn get(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>> {
        Ok(self
            .lock()?
            .get(bucket)
            .and_then(|entries| entries.get(url))
            .cloned())
    }

    fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<()> {
        self.lock()?
            .entry(bucket.to_string())
            .or_default()
            .insert(url.to_string(), response.clone());
        Ok(())
    }

    fn entry_count(&self, bucket: &str) -> Result<usize> {
        Ok(self.lock()?.get(bucket).map(HashMap::len).unwrap_or(0))
    }

    fn delete_bucket(&self, bucket: &str) -> Result<bool> {
        Ok(self.lock()?.remove(bucket).is_some())
    }
}

/// Header line at the start of every entry file. The body follows the newline.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryHeader {
    url: String,
    body_len: usize,
    #[serde(flatten)]
    response: CachedResponse,
}

/// Filesystem store: one directory per bucket, one file per entry.
///
/// Entry files are named by the CRC32 of the URL and hold a JSON header line
/// followed by the body. Each write goes to its own temp file in the bucket
/// directory and is renamed over the entry, so concurrent writers never share a
/// partial file. The URL is checked on read, so a hash collision degrades to a
/// cache miss, as does a body whose length disagrees with the header.
#[cfg(not(target_arch = "wasm32"))]
pub struct DiskStore {
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
const ENTRY_EXTENSION: &str = "entry";

#[cfg(not(target_arch = "wasm32"))]
impl DiskStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        log::debug!("Opened disk cache at {:?}", root);
        Ok(Self { root })
    }

    /// Default location under the user cache directory.
    pub fn default_root() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("flipbook"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(sanitize_bucket(bucket))
    }

    fn entry_path(dir: &Path, url: &str) -> PathBuf {
        dir.join(format!(
            "{:08x}.{}",
            crc32fast::hash(url.as_bytes()),
            ENTRY_EXTENSION
        ))
    }

    fn encode_entry(url: &str, response: &CachedResponse) -> Result<Vec<u8>> {
        let header = EntryHeader {
            url: url.to_string(),
            body_len: response.body.len(),
            response: CachedResponse {
                body: Vec::new(),
                ..response.clone()
            },
        };
        let mut bytes = serde_json::to_vec(&header)?;
        bytes.push(b'\n');
        bytes.extend_from_slice(&response.body);
        Ok(bytes)
    }

    /// Split an entry file into its response, or `None` when it belongs to another
    /// URL or is damaged.
    fn decode_entry(url: &str, bytes: &[u8]) -> Result<Option<CachedResponse>> {
        let Some(split) = bytes.iter().position(|&b| b == b'\n') else {
            log::warn!("Cache entry for {} has no header", url);
            return Ok(None);
        };
        let header: EntryHeader = serde_json::from_slice(&bytes[..split])?;
        if header.url != url {
            log::debug!("Cache key collision for {} (stored {})", url, header.url);
            return Ok(None);
        }
        let body = &bytes[split + 1..];
        if body.len() != header.body_len {
            log::warn!(
                "Cache entry for {} is {} bytes, expected {}",
                url,
                body.len(),
                header.body_len
            );
            return Ok(None);
        }
        Ok(Some(CachedResponse {
            body: body.to_vec(),
            ..header.response
        }))
    }
}

/// Bucket names come from the version tag; keep them filesystem-safe.
#[cfg(not(target_arch = "wasm32"))]
fn sanitize_bucket(bucket: &str) -> String {
    bucket
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(not(target_arch = "wasm32"))]
impl CacheStore for DiskStore {
    fn bucket_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn get(&self, bucket: &str, url: &str) -> Result<Option<CachedResponse>> {
        let path = Self::entry_path(&self.bucket_dir(bucket), url);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::decode_entry(url, &bytes)
    }

    fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<()> {
        let dir = self.bucket_dir(bucket);
        std::fs::create_dir_all(&dir)?;
        let bytes = Self::encode_entry(url, response)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(Self::entry_path(&dir, url))
            .map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }

    fn entry_count(&self, bucket: &str) -> Result<usize> {
        let dir = self.bucket_dir(bucket);
        if !dir.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn delete_bucket(&self, bucket: &str) -> Result<bool> {
        let dir = self.bucket_dir(bucket);
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(dir)?;
        Ok(true)
    }
}
