//! Browser fetches that go through the Cache API (wasm only).
//!
//! The same buckets and strategies as the native coordinator apply: page images
//! cache-first, API calls stale-while-revalidate, everything else straight to the
//! network. Every function here is async or spawns local tasks; nothing blocks the
//! main thread.

use flipbook_cache::coordinator::{first_page_urls, is_stale_bucket};
use flipbook_cache::strategy::{classify, OFFLINE_API_MESSAGE, OFFLINE_IMAGE_MESSAGE};
use flipbook_cache::{CacheCommand, CoordinatorConfig, HttpResponse, NetError, RequestKind};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{Cache, CacheStorage, Response};

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn fail(url: &str, value: JsValue) -> NetError {
    NetError::new(url, js_message(&value))
}

fn cache_storage() -> Option<CacheStorage> {
    web_sys::window()?.caches().ok()
}

async fn open_bucket(name: &str) -> Option<Cache> {
    let opened = JsFuture::from(cache_storage()?.open(name)).await;
    match opened {
        Ok(cache) => cache.dyn_into::<Cache>().ok(),
        Err(e) => {
            log::warn!("Could not open cache {}: {}", name, js_message(&e));
            None
        }
    }
}

async fn lookup(cache: &Cache, url: &str) -> Option<Response> {
    let found = JsFuture::from(cache.match_with_str(url)).await.ok()?;
    if found.is_undefined() {
        return None;
    }
    found.dyn_into::<Response>().ok()
}

async fn network(url: &str) -> Result<Response, NetError> {
    let window = web_sys::window().ok_or_else(|| NetError::new(url, "no window"))?;
    JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| fail(url, e))?
        .dyn_into::<Response>()
        .map_err(|e| fail(url, e))
}

async fn read(url: &str, response: Response) -> Result<HttpResponse, NetError> {
    let status = response.status();
    let content_type = response.headers().get("content-type").ok().flatten();
    let buffer = JsFuture::from(response.array_buffer().map_err(|e| fail(url, e))?)
        .await
        .map_err(|e| fail(url, e))?;
    Ok(HttpResponse {
        status,
        content_type,
        body: js_sys::Uint8Array::new(&buffer).to_vec(),
    })
}

/// Fetch `url` and store a copy in `cache` if the answer is a 2xx.
async fn fetch_and_store(cache: Option<&Cache>, url: &str) -> Result<HttpResponse, NetError> {
    let response = network(url).await?;
    if let (true, Some(cache)) = (response.ok(), cache) {
        match response.clone() {
            Ok(copy) => {
                if let Err(e) = JsFuture::from(cache.put_with_str(url, &copy)).await {
                    log::warn!("Failed to cache {}: {}", url, js_message(&e));
                } else {
                    log::debug!("Cached from network: {}", url);
                }
            }
            Err(e) => log::warn!("Could not copy {} for the cache: {}", url, js_message(&e)),
        }
    }
    read(url, response).await
}

async fn revalidate(url: String, bucket: String) {
    let cache = open_bucket(&bucket).await;
    match fetch_and_store(cache.as_ref(), &url).await {
        Ok(response) if response.is_success() => log::debug!("Revalidated: {}", url),
        Ok(response) => log::warn!("Revalidation of {} got HTTP {}", url, response.status),
        Err(e) => log::warn!("Revalidation failed: {}", e),
    }
}

/// GET `url` with the strategy its path calls for.
///
/// Transport failures on images and API calls become synthetic 503s, as with the
/// native coordinator.
pub async fn get(url: &str) -> Result<HttpResponse, NetError> {
    let config = CoordinatorConfig::default();
    match classify(url, &config) {
        RequestKind::PageImage => {
            let cache = open_bucket(&config.image_bucket()).await;
            if let Some(cache) = cache.as_ref() {
                if let Some(hit) = lookup(cache, url).await {
                    log::debug!("Cache hit: {}", url);
                    return read(url, hit).await;
                }
            }
            match fetch_and_store(cache.as_ref(), url).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    log::error!("Network error: {}", e);
                    Ok(HttpResponse::unavailable(OFFLINE_IMAGE_MESSAGE))
                }
            }
        }
        RequestKind::Api => {
            let bucket = config.api_bucket();
            let cache = open_bucket(&bucket).await;
            if let Some(cache) = cache.as_ref() {
                if let Some(hit) = lookup(cache, url).await {
                    log::debug!("Serving stale: {}", url);
                    spawn_local(revalidate(url.to_string(), bucket));
                    return read(url, hit).await;
                }
            }
            match fetch_and_store(cache.as_ref(), url).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    log::error!("Network error: {}", e);
                    Ok(HttpResponse::unavailable(OFFLINE_API_MESSAGE))
                }
            }
        }
        RequestKind::PassThrough => read(url, network(url).await?).await,
    }
}

async fn bucket_names(storage: &CacheStorage) -> Vec<String> {
    match JsFuture::from(storage.keys()).await {
        Ok(keys) => js_sys::Array::from(&keys)
            .iter()
            .filter_map(|name| name.as_string())
            .collect(),
        Err(e) => {
            log::warn!("Could not list cache buckets: {}", js_message(&e));
            Vec::new()
        }
    }
}

async fn delete_buckets(keep: impl Fn(&str) -> bool) {
    let Some(storage) = cache_storage() else {
        return;
    };
    for name in bucket_names(&storage).await {
        if keep(&name) {
            continue;
        }
        match JsFuture::from(storage.delete(&name)).await {
            Ok(_) => log::info!("Deleting cache: {}", name),
            Err(e) => log::warn!("Failed to delete {}: {}", name, js_message(&e)),
        }
    }
}

/// Drop buckets left by older cache versions.
pub fn purge_stale_versions() {
    let version = CoordinatorConfig::default().version;
    spawn_local(async move {
        delete_buckets(|name| !is_stale_bucket(name, &version)).await;
    });
}

async fn prefetch(urls: Vec<String>) {
    let config = CoordinatorConfig::default();
    let cache = open_bucket(&config.image_bucket()).await;
    for url in urls {
        if let Some(cache) = cache.as_ref() {
            if lookup(cache, &url).await.is_some() {
                log::trace!("Already cached: {}", url);
                continue;
            }
        }
        match fetch_and_store(cache.as_ref(), &url).await {
            Ok(response) if response.is_success() => log::debug!("Dynamically cached: {}", url),
            Ok(response) => log::warn!("Failed to cache {}: HTTP {}", url, response.status),
            Err(e) => log::warn!("Failed to cache {}: {}", url, e),
        }
    }
}

async fn precache_first_pages(api_url: String, flipbook_id: String, count: usize) {
    if api_url.is_empty() || flipbook_id.is_empty() {
        return;
    }
    let api_url = api_url.trim_end_matches('/').to_string();
    let endpoint = format!("{}/api/flipbooks/{}/pages", api_url, flipbook_id);
    let response = match network(&endpoint).await {
        Ok(response) => read(&endpoint, response).await,
        Err(e) => Err(e),
    };
    match response {
        Ok(response) if response.is_success() => {
            match first_page_urls(&api_url, &response.body, count) {
                Ok(urls) => {
                    log::info!("Pre-caching first {} pages of {}", urls.len(), flipbook_id);
                    prefetch(urls).await;
                }
                Err(e) => log::warn!("Pre-cache pages error: {}", e),
            }
        }
        Ok(response) => log::warn!(
            "Pre-cache pages got HTTP {} from {}",
            response.status,
            endpoint
        ),
        Err(e) => log::warn!("Pre-cache pages error: {}", e),
    }
}

/// Carry out a coordinator command against the browser cache. Fire-and-forget.
pub fn post(command: CacheCommand) {
    log::debug!("Browser cache command: {}", command.name());
    match command {
        CacheCommand::CacheFlipbookPages { pages } => spawn_local(prefetch(pages)),
        CacheCommand::PrecacheFirstPages {
            api_url,
            flipbook_id,
            count,
        } => spawn_local(precache_first_pages(api_url, flipbook_id, count)),
        CacheCommand::ClearCache => spawn_local(async {
            delete_buckets(|_| false).await;
            log::info!("All caches cleared");
        }),
        CacheCommand::GetCacheStatus => {
            log::debug!("Cache status is only answered by the native coordinator")
        }
    }
}
