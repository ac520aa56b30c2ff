//! Request strategies applied by the coordinator when it intercepts a fetch.

use crate::coordinator::CoordinatorConfig;
use crate::net::{Fetcher, HttpResponse};
use crate::store::{CacheStore, CachedResponse};

/// Body of the synthetic response for an image neither cached nor reachable.
pub const OFFLINE_IMAGE_MESSAGE: &str = "Image not available offline";

/// Body of the synthetic response for an API call neither cached nor reachable.
pub const OFFLINE_API_MESSAGE: &str = "Service Unavailable";

/// Which strategy a URL falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Flipbook page image: cache-first with network fallback.
    PageImage,
    /// Backend API call: stale-while-revalidate.
    Api,
    /// Anything else goes straight to the network.
    PassThrough,
}

/// Path component of a URL, without query or fragment.
fn url_path(url: &str) -> &str {
    let after_scheme = match url.find("://") {
        Some(pos) => &url[pos + 3..],
        None => url,
    };
    let path = match after_scheme.find('/') {
        Some(pos) if url.contains("://") => &after_scheme[pos..],
        Some(_) => after_scheme,
        None => "/",
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Classify a URL by its path. Image paths win over API paths.
pub fn classify(url: &str, config: &CoordinatorConfig) -> RequestKind {
    let path = url_path(url);
    if path.contains(&config.image_marker) {
        RequestKind::PageImage
    } else if path.contains(&config.api_marker) {
        RequestKind::Api
    } else {
        RequestKind::PassThrough
    }
}

/// Fetch `url` and store it in `bucket` if the answer is a 2xx.
///
/// Returns the network response (success or not). Store failures are logged only.
pub fn fetch_and_store(
    store: &dyn CacheStore,
    fetcher: &dyn Fetcher,
    bucket: &str,
    url: &str,
) -> Result<HttpResponse, crate::NetError> {
    let response = fetcher.get(url)?;
    if response.is_success() {
        match store.put(bucket, url, &CachedResponse::from(&response)) {
            Ok(()) => log::debug!("Cached from network: {}", url),
            Err(e) => log::warn!("Failed to store {} in {}: {}", url, bucket, e),
        }
    }
    Ok(response)
}

fn lookup(store: &dyn CacheStore, bucket: &str, url: &str) -> Option<CachedResponse> {
    match store.get(bucket, url) {
        Ok(found) => found,
        Err(e) => {
            log::warn!("Cache read failed for {}: {}", url, e);
            None
        }
    }
}

/// Serve from `bucket` if present, else fetch and store.
///
/// A transport failure becomes a synthetic 503 instead of an error.
pub fn cache_first(
    store: &dyn CacheStore,
    fetcher: &dyn Fetcher,
    bucket: &str,
    url: &str,
) -> HttpResponse {
    if let Some(cached) = lookup(store, bucket, url) {
        log::debug!("Cache hit: {}", url);
        return cached.into();
    }

    match fetch_and_store(store, fetcher, bucket, url) {
        Ok(response) => response,
        Err(e) => {
            log::error!("Network error: {}", e);
            HttpResponse::unavailable(OFFLINE_IMAGE_MESSAGE)
        }
    }
}

/// Serve a cached copy immediately and ask `revalidate` to refresh it, or wait for
/// the network when nothing is cached.
pub fn stale_while_revalidate(
    store: &dyn CacheStore,
    fetcher: &dyn Fetcher,
    bucket: &str,
    url: &str,
    revalidate: impl FnOnce(&str),
) -> HttpResponse {
    if let Some(cached) = lookup(store, bucket, url) {
        log::debug!("Serving stale: {}", url);
        revalidate(url);
        return cached.into();
    }

    match fetch_and_store(store, fetcher, bucket, url) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("Network error: {}", e);
            HttpResponse::unavailable(OFFLINE_API_MESSAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MemoryFetcher;
    use crate::store::MemoryStore;

    #[test]
    fn test_classify() {
        let config = CoordinatorConfig::default();
        assert_eq!(
            classify("http://h/uploads/flipbooks/abc/1.jpg", &config),
            RequestKind::PageImage
        );
        assert_eq!(
            classify("http://h/api/flipbooks/featured/current?x=1", &config),
            RequestKind::Api
        );
        assert_eq!(classify("http://h/static/app.js", &config), RequestKind::PassThrough);
        // Marker in the query string does not count.
        assert_eq!(
            classify("http://h/img?from=/api/", &config),
            RequestKind::PassThrough
        );
    }

    #[test]
    fn test_cache_first_stores_and_hits() {
        let store = MemoryStore::new();
        let fetcher = MemoryFetcher::new();
        let url = "http://h/uploads/flipbooks/a/1.jpg";
        fetcher.respond(url, HttpResponse::ok(b"img".to_vec()));

        let first = cache_first(&store, &fetcher, "b", url);
        let second = cache_first(&store, &fetcher, "b", url);

        assert_eq!(first.body, b"img");
        assert_eq!(second.body, b"img");
        assert_eq!(fetcher.request_count(url), 1);
    }

    #[test]
    fn test_cache_first_does_not_store_errors() {
        let store = MemoryStore::new();
        let fetcher = MemoryFetcher::new();
        let url = "http://h/uploads/flipbooks/a/missing.jpg";

        let response = cache_first(&store, &fetcher, "b", url);
        assert_eq!(response.status, 404);
        assert_eq!(store.entry_count("b").unwrap(), 0);
    }

    #[test]
    fn test_cache_first_offline_fallback() {
        let store = MemoryStore::new();
        let fetcher = MemoryFetcher::new();
        let url = "http://h/uploads/flipbooks/a/1.jpg";
        fetcher.fail(url, "offline");

        let response = cache_first(&store, &fetcher, "b", url);
        assert_eq!(response.status, 503);
        assert_eq!(response.text(), OFFLINE_IMAGE_MESSAGE);
    }

    #[test]
    fn test_stale_while_revalidate() {
        let store = MemoryStore::new();
        let fetcher = MemoryFetcher::new();
        let url = "http://h/api/flipbooks/featured/current";
        fetcher.respond(url, HttpResponse::ok(b"v1".to_vec()));

        let mut revalidated = Vec::new();
        let first = stale_while_revalidate(&store, &fetcher, "api", url, |u| {
            revalidated.push(u.to_string())
        });
        assert_eq!(first.body, b"v1");
        assert!(revalidated.is_empty());

        fetcher.respond(url, HttpResponse::ok(b"v2".to_vec()));
        let second = stale_while_revalidate(&store, &fetcher, "api", url, |u| {
            revalidated.push(u.to_string())
        });
        assert_eq!(second.body, b"v1");
        assert_eq!(revalidated, vec![url.to_string()]);
    }

    #[test]
    fn test_stale_while_revalidate_offline_without_copy() {
        let store = MemoryStore::new();
        let fetcher = MemoryFetcher::new();
        let url = "http://h/api/x";
        fetcher.fail(url, "offline");

        let response = stale_while_revalidate(&store, &fetcher, "api", url, |_| {});
        assert_eq!(response.status, 503);
    }
}
