//! Long-lived cache coordinator (native background thread).
//!
//! The coordinator owns the cache buckets for one version tag. Foreground code talks
//! to it through a [`CacheHandle`]: commands are posted over an mpsc channel and the
//! only request/response exchange is the status query. Bulk pre-fetches run on
//! short-lived worker threads so a `CLEAR_CACHE` posted behind them is handled right
//! away; a generation counter bumped by the clear stops them before further writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, NetError, Result};
use crate::net::{resolve_url, Fetcher, HttpResponse};
use crate::protocol::{CacheCommand, CacheReply, CacheStatus};
use crate::store::CacheStore;
use crate::strategy::{self, RequestKind};

/// Default cache version tag. Bump it to drop every bucket of older builds.
pub const DEFAULT_CACHE_VERSION: &str = "flipbook-v2";

/// Prefix shared by every bucket this coordinator has ever created.
pub const BUCKET_PREFIX: &str = "flipbook-";

/// Default number of concurrent fetches in a bulk pre-fetch.
pub const DEFAULT_PREFETCH_CONCURRENCY: usize = 3;

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Version tag prefixed to every bucket name.
    pub version: String,
    /// Path fragment identifying page images.
    pub image_marker: String,
    /// Path fragment identifying backend API calls.
    pub api_marker: String,
    /// Fetches in flight at once during a bulk pre-fetch.
    pub prefetch_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CACHE_VERSION.to_string(),
            image_marker: "/uploads/flipbooks/".to_string(),
            api_marker: "/api/".to_string(),
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_prefetch_concurrency(mut self, concurrency: usize) -> Self {
        self.prefetch_concurrency = concurrency.max(1);
        self
    }

    /// Bucket holding page images.
    pub fn image_bucket(&self) -> String {
        format!("{}-flipbook", self.version)
    }

    /// Bucket holding API responses.
    pub fn api_bucket(&self) -> String {
        format!("{}-api", self.version)
    }
}

/// State shared between the handle, the coordinator thread and pre-fetch workers.
struct Shared {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    config: CoordinatorConfig,
    /// Bumped by every clear.
    generation: AtomicU64,
    /// Posted work not finished yet.
    in_flight: Mutex<usize>,
    idle: Condvar,
}

impl Shared {
    fn begin_work(self: &Arc<Self>) -> WorkGuard {
        if let Ok(mut count) = self.in_flight.lock() {
            *count += 1;
        }
        WorkGuard(Arc::clone(self))
    }
}

/// Marks one unit of posted work as finished when dropped.
struct WorkGuard(Arc<Shared>);

impl Drop for WorkGuard {
    fn drop(&mut self) {
        if let Ok(mut count) = self.0.in_flight.lock() {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.0.idle.notify_all();
            }
        }
    }
}

enum Envelope {
    Command {
        command: CacheCommand,
        reply: Option<Sender<CacheReply>>,
        guard: WorkGuard,
    },
    Revalidate {
        url: String,
        guard: WorkGuard,
    },
    Shutdown,
}

/// Cloneable, thread-safe access to a running coordinator.
#[derive(Clone)]
pub struct CacheHandle {
    tx: Sender<Envelope>,
    shared: Arc<Shared>,
}

impl CacheHandle {
    /// Fire-and-forget a command.
    pub fn post(&self, command: CacheCommand) -> Result<()> {
        log::debug!("Posting {} to cache coordinator", command.name());
        let guard = self.shared.begin_work();
        self.tx
            .send(Envelope::Command {
                command,
                reply: None,
                guard,
            })
            .map_err(|_| CacheError::Disconnected)
    }

    /// Entry counts per bucket.
    pub fn status(&self, timeout: Duration) -> Result<CacheStatus> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let guard = self.shared.begin_work();
        self.tx
            .send(Envelope::Command {
                command: CacheCommand::GetCacheStatus,
                reply: Some(reply_tx),
                guard,
            })
            .map_err(|_| CacheError::Disconnected)?;

        match reply_rx.recv_timeout(timeout) {
            Ok(CacheReply::CacheStatus(status)) => Ok(status),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(CacheError::Timeout(timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(CacheError::Disconnected),
        }
    }

    /// Intercepted GET: applies the strategy matching the URL.
    pub fn fetch(&self, url: &str) -> std::result::Result<HttpResponse, NetError> {
        let shared = &self.shared;
        match strategy::classify(url, &shared.config) {
            RequestKind::PageImage => Ok(strategy::cache_first(
                shared.store.as_ref(),
                shared.fetcher.as_ref(),
                &shared.config.image_bucket(),
                url,
            )),
            RequestKind::Api => Ok(strategy::stale_while_revalidate(
                shared.store.as_ref(),
                shared.fetcher.as_ref(),
                &shared.config.api_bucket(),
                url,
                |stale| self.revalidate(stale),
            )),
            RequestKind::PassThrough => shared.fetcher.get(url),
        }
    }

    fn revalidate(&self, url: &str) {
        let guard = self.shared.begin_work();
        if self
            .tx
            .send(Envelope::Revalidate {
                url: url.to_string(),
                guard,
            })
            .is_err()
        {
            log::debug!("Coordinator gone, skipping revalidation of {}", url);
        }
    }

    /// Block until every posted command and background fetch has finished.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let Ok(count) = self.shared.in_flight.lock() else {
            return false;
        };
        match self
            .shared
            .idle
            .wait_timeout_while(count, timeout, |count| *count > 0)
        {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }
}

impl Fetcher for CacheHandle {
    fn get(&self, url: &str) -> std::result::Result<HttpResponse, NetError> {
        self.fetch(url)
    }
}

/// Owner of the coordinator thread. Dropping it stops the thread.
pub struct CacheCoordinator {
    handle: CacheHandle,
    thread_handle: Option<JoinHandle<()>>,
}

impl CacheCoordinator {
    /// Start the coordinator. Stale buckets are purged on the new thread before any
    /// command is processed.
    pub fn spawn(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Envelope>();
        let shared = Arc::new(Shared {
            store,
            fetcher,
            config,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(0),
            idle: Condvar::new(),
        });

        // Counted as work so `wait_idle` also covers the startup purge.
        let startup = shared.begin_work();
        let thread_shared = Arc::clone(&shared);
        let thread_handle = thread::Builder::new()
            .name("cache-coordinator".to_string())
            .spawn(move || {
                log::info!(
                    "Cache coordinator started (version {})",
                    thread_shared.config.version
                );
                purge_stale_versions(&thread_shared);
                drop(startup);
                Self::thread_loop(&thread_shared, rx);
                log::info!("Cache coordinator exiting");
            })
            .map_err(|e| CacheError::Spawn(e.to_string()))?;

        Ok(Self {
            handle: CacheHandle { tx, shared },
            thread_handle: Some(thread_handle),
        })
    }

    pub fn handle(&self) -> CacheHandle {
        self.handle.clone()
    }

    fn thread_loop(shared: &Arc<Shared>, rx: Receiver<Envelope>) {
        loop {
            match rx.recv() {
                Ok(Envelope::Command {
                    command,
                    reply,
                    guard,
                }) => Self::handle_command(shared, command, reply, guard),
                Ok(Envelope::Revalidate { url, guard }) => {
                    let worker = Arc::clone(shared);
                    spawn_worker("cache-revalidate", move || {
                        let _guard = guard;
                        revalidate(&worker, &url);
                    });
                }
                Ok(Envelope::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Command channel closed, cache coordinator exiting");
                    break;
                }
            }
        }
    }

    fn handle_command(
        shared: &Arc<Shared>,
        command: CacheCommand,
        reply: Option<Sender<CacheReply>>,
        guard: WorkGuard,
    ) {
        match command {
            CacheCommand::CacheFlipbookPages { pages } => {
                let generation = shared.generation.load(Ordering::SeqCst);
                let worker = Arc::clone(shared);
                spawn_worker("cache-prefetch", move || {
                    let _guard = guard;
                    prefetch_images(&worker, &pages, generation);
                });
            }
            CacheCommand::PrecacheFirstPages {
                api_url,
                flipbook_id,
                count,
            } => {
                let generation = shared.generation.load(Ordering::SeqCst);
                let worker = Arc::clone(shared);
                spawn_worker("cache-precache", move || {
                    let _guard = guard;
                    precache_first_pages(&worker, &api_url, &flipbook_id, count, generation);
                });
            }
            CacheCommand::ClearCache => {
                shared.generation.fetch_add(1, Ordering::SeqCst);
                clear_all(shared);
            }
            CacheCommand::GetCacheStatus => {
                let status = cache_status(shared);
                if let Some(reply) = reply {
                    if reply.send(CacheReply::CacheStatus(status)).is_err() {
                        log::debug!("Status requester went away");
                    }
                }
            }
        }
    }
}

impl Drop for CacheCoordinator {
    fn drop(&mut self) {
        let _ = self.handle.tx.send(Envelope::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("Cache coordinator thread panicked");
            }
        }
    }
}

fn spawn_worker(name: &str, work: impl FnOnce() + Send + 'static) {
    if let Err(e) = thread::Builder::new().name(name.to_string()).spawn(work) {
        log::warn!("Failed to spawn {} thread: {}", name, e);
    }
}

/// Whether `name` is one of our buckets but from a version other than `version`.
pub fn is_stale_bucket(name: &str, version: &str) -> bool {
    name.starts_with(BUCKET_PREFIX) && !name.starts_with(&format!("{}-", version))
}

/// Delete buckets from other versions.
fn purge_stale_versions(shared: &Shared) {
    let names = match shared.store.bucket_names() {
        Ok(names) => names,
        Err(e) => {
            log::warn!("Could not list cache buckets: {}", e);
            return;
        }
    };
    for name in names {
        if is_stale_bucket(&name, &shared.config.version) {
            log::info!("Deleting old cache: {}", name);
            if let Err(e) = shared.store.delete_bucket(&name) {
                log::warn!("Failed to delete {}: {}", name, e);
            }
        }
    }
}

fn clear_all(shared: &Shared) {
    match shared.store.bucket_names() {
        Ok(names) => {
            for name in names {
                if let Err(e) = shared.store.delete_bucket(&name) {
                    log::warn!("Failed to delete {}: {}", name, e);
                }
            }
            log::info!("All caches cleared");
        }
        Err(e) => log::warn!("Could not list cache buckets: {}", e),
    }
}

fn cache_status(shared: &Shared) -> CacheStatus {
    let mut status = CacheStatus::new();
    match shared.store.bucket_names() {
        Ok(names) => {
            for name in names {
                match shared.store.entry_count(&name) {
                    Ok(count) => {
                        status.insert(name, count);
                    }
                    Err(e) => log::warn!("Could not count {}: {}", name, e),
                }
            }
        }
        Err(e) => log::warn!("Could not list cache buckets: {}", e),
    }
    status
}

/// Fetch `urls` into the image bucket, `prefetch_concurrency` at a time.
///
/// Failures are logged and skipped. Stops before writing once a clear has happened.
fn prefetch_images(shared: &Shared, urls: &[String], generation: u64) {
    let bucket = shared.config.image_bucket();
    let concurrency = shared.config.prefetch_concurrency.max(1);

    for chunk in urls.chunks(concurrency) {
        if shared.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Pre-fetch aborted by cache clear");
            return;
        }
        thread::scope(|scope| {
            for url in chunk {
                let bucket = bucket.as_str();
                scope.spawn(move || prefetch_one(shared, bucket, url, generation));
            }
        });
    }
}

fn prefetch_one(shared: &Shared, bucket: &str, url: &str, generation: u64) {
    match shared.store.get(bucket, url) {
        Ok(Some(_)) => {
            log::trace!("Already cached: {}", url);
            return;
        }
        Ok(None) => {}
        Err(e) => log::debug!("Cache read failed for {}: {}", url, e),
    }

    let response = match shared.fetcher.get(url) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("Failed to cache {}: {}", url, e);
            return;
        }
    };
    if !response.is_success() {
        log::warn!("Failed to cache {}: HTTP {}", url, response.status);
        return;
    }
    if shared.generation.load(Ordering::SeqCst) != generation {
        log::debug!("Dropping {} fetched before cache clear", url);
        return;
    }
    match shared.store.put(bucket, url, &(&response).into()) {
        Ok(()) => log::debug!("Dynamically cached: {}", url),
        Err(e) => log::warn!("Failed to store {}: {}", url, e),
    }
}

fn revalidate(shared: &Shared, url: &str) {
    let bucket = shared.config.api_bucket();
    match strategy::fetch_and_store(shared.store.as_ref(), shared.fetcher.as_ref(), &bucket, url)
    {
        Ok(response) if response.is_success() => log::debug!("Revalidated: {}", url),
        Ok(response) => log::warn!("Revalidation of {} got HTTP {}", url, response.status),
        Err(e) => log::warn!("Revalidation failed: {}", e),
    }
}

/// Minimal page shape needed to find image URLs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRef {
    #[serde(default)]
    page_number: Option<i64>,
    #[serde(default)]
    image_url: Option<String>,
}

/// Image URLs of the first `count` pages, in page-number order.
pub fn first_page_urls(api_url: &str, body: &[u8], count: usize) -> Result<Vec<String>> {
    let mut pages: Vec<PageRef> = serde_json::from_slice(body)?;
    pages.sort_by_key(|p| p.page_number.unwrap_or(0));
    Ok(pages
        .iter()
        .take(count)
        .filter_map(|p| p.image_url.as_deref())
        .filter_map(|u| resolve_url(api_url, u))
        .collect())
}

fn precache_first_pages(
    shared: &Shared,
    api_url: &str,
    flipbook_id: &str,
    count: usize,
    generation: u64,
) {
    if api_url.is_empty() || flipbook_id.is_empty() {
        return;
    }
    let endpoint = format!(
        "{}/api/flipbooks/{}/pages",
        api_url.trim_end_matches('/'),
        flipbook_id
    );
    let response = match shared.fetcher.get(&endpoint) {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            log::warn!("Pre-cache pages got HTTP {} from {}", response.status, endpoint);
            return;
        }
        Err(e) => {
            log::warn!("Pre-cache pages error: {}", e);
            return;
        }
    };
    match first_page_urls(api_url.trim_end_matches('/'), &response.body, count) {
        Ok(urls) => {
            log::info!("Pre-caching first {} pages of {}", urls.len(), flipbook_id);
            prefetch_images(shared, &urls, generation);
        }
        Err(e) => log::warn!("Pre-cache pages error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::MemoryFetcher;
    use crate::store::{CachedResponse, MemoryStore};

    const WAIT: Duration = Duration::from_secs(5);

    fn image_url(n: u32) -> String {
        format!("http://h/uploads/flipbooks/fb/{}.jpg", n)
    }

    fn setup() -> (Arc<MemoryStore>, Arc<MemoryFetcher>, CacheCoordinator) {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(MemoryFetcher::new());
        let coordinator = CacheCoordinator::spawn(
            store.clone(),
            fetcher.clone(),
            CoordinatorConfig::default(),
        )
        .unwrap();
        (store, fetcher, coordinator)
    }

    #[test]
    fn test_failed_prefetch_is_skipped() {
        let (_store, fetcher, coordinator) = setup();
        fetcher.respond(&image_url(1), HttpResponse::ok(b"1".to_vec()));
        fetcher.fail(&image_url(2), "connection reset");
        fetcher.respond(&image_url(3), HttpResponse::ok(b"3".to_vec()));

        let handle = coordinator.handle();
        handle
            .post(CacheCommand::CacheFlipbookPages {
                pages: vec![image_url(1), image_url(2), image_url(3)],
            })
            .unwrap();
        assert!(handle.wait_idle(WAIT));

        let status = handle.status(WAIT).unwrap();
        assert_eq!(status.get("flipbook-v2-flipbook"), Some(&2));
        assert_eq!(fetcher.request_count(&image_url(2)), 1);
    }

    #[test]
    fn test_startup_purges_old_versions() {
        let store = Arc::new(MemoryStore::new());
        let entry = CachedResponse {
            status: 200,
            content_type: None,
            body: b"x".to_vec(),
        };
        store.put("flipbook-v1-flipbook", "http://a", &entry).unwrap();
        store.put("flipbook-v20-flipbook", "http://d", &entry).unwrap();
        store.put("flipbook-v2-api", "http://b", &entry).unwrap();
        store.put("other-bucket", "http://c", &entry).unwrap();

        let coordinator = CacheCoordinator::spawn(
            store.clone(),
            Arc::new(MemoryFetcher::new()),
            CoordinatorConfig::default(),
        )
        .unwrap();
        assert!(coordinator.handle().wait_idle(WAIT));

        assert_eq!(
            store.bucket_names().unwrap(),
            vec!["flipbook-v2-api".to_string(), "other-bucket".to_string()]
        );
    }

    #[test]
    fn test_stale_bucket_needs_exact_version() {
        assert!(is_stale_bucket("flipbook-v1-api", "flipbook-v2"));
        assert!(is_stale_bucket("flipbook-v20-flipbook", "flipbook-v2"));
        assert!(!is_stale_bucket("flipbook-v2-flipbook", "flipbook-v2"));
        assert!(!is_stale_bucket("other-bucket", "flipbook-v2"));
    }

    #[test]
    fn test_clear_cache_empties_everything() {
        let (store, fetcher, coordinator) = setup();
        fetcher.respond(&image_url(1), HttpResponse::ok(b"1".to_vec()));
        let handle = coordinator.handle();

        handle
            .post(CacheCommand::CacheFlipbookPages {
                pages: vec![image_url(1)],
            })
            .unwrap();
        assert!(handle.wait_idle(WAIT));
        assert_eq!(store.entry_count("flipbook-v2-flipbook").unwrap(), 1);

        handle.post(CacheCommand::ClearCache).unwrap();
        assert!(handle.wait_idle(WAIT));
        assert!(handle.status(WAIT).unwrap().is_empty());
    }

    #[test]
    fn test_fetch_routes_images_through_cache() {
        let (store, fetcher, coordinator) = setup();
        let url = image_url(4);
        fetcher.respond(&url, HttpResponse::ok(b"4".to_vec()));
        let handle = coordinator.handle();

        assert_eq!(handle.fetch(&url).unwrap().body, b"4");
        assert_eq!(handle.fetch(&url).unwrap().body, b"4");
        assert_eq!(fetcher.request_count(&url), 1);
        assert_eq!(store.entry_count("flipbook-v2-flipbook").unwrap(), 1);
    }

    #[test]
    fn test_fetch_api_revalidates_in_background() {
        let (store, fetcher, coordinator) = setup();
        let url = "http://h/api/flipbooks/featured/current";
        fetcher.respond(url, HttpResponse::ok(b"old".to_vec()));
        let handle = coordinator.handle();

        assert_eq!(handle.fetch(url).unwrap().body, b"old");
        fetcher.respond(url, HttpResponse::ok(b"new".to_vec()));

        // Stale copy served, fresh one stored behind it.
        assert_eq!(handle.fetch(url).unwrap().body, b"old");
        assert!(handle.wait_idle(WAIT));
        assert_eq!(
            store.get("flipbook-v2-api", url).unwrap().unwrap().body,
            b"new"
        );
        assert_eq!(handle.fetch(url).unwrap().body, b"new");
    }

    #[test]
    fn test_fetch_passes_other_urls_through() {
        let (store, fetcher, coordinator) = setup();
        fetcher.respond("http://h/index.html", HttpResponse::ok(b"page".to_vec()));
        let handle = coordinator.handle();

        assert_eq!(handle.fetch("http://h/index.html").unwrap().body, b"page");
        assert!(handle.fetch("http://h/missing").unwrap().status == 404);
        assert!(store.bucket_names().unwrap().is_empty());
    }

    #[test]
    fn test_precache_first_pages() {
        let (store, fetcher, coordinator) = setup();
        let pages = r#"[
            {"pageNumber": 3, "imageUrl": "/uploads/flipbooks/fb/3.jpg"},
            {"pageNumber": 1, "imageUrl": "uploads/flipbooks/fb/1.jpg"},
            {"pageNumber": 2, "imageUrl": "http://h/uploads/flipbooks/fb/2.jpg"}
        ]"#;
        fetcher.respond(
            "http://h/api/flipbooks/fb/pages",
            HttpResponse::ok(pages.as_bytes().to_vec()),
        );
        for n in 1..=3 {
            fetcher.respond(&image_url(n), HttpResponse::ok(vec![n as u8]));
        }

        let handle = coordinator.handle();
        handle
            .post(CacheCommand::PrecacheFirstPages {
                api_url: "http://h".to_string(),
                flipbook_id: "fb".to_string(),
                count: 2,
            })
            .unwrap();
        assert!(handle.wait_idle(WAIT));

        assert!(store.get("flipbook-v2-flipbook", &image_url(1)).unwrap().is_some());
        assert!(store.get("flipbook-v2-flipbook", &image_url(2)).unwrap().is_some());
        assert!(store.get("flipbook-v2-flipbook", &image_url(3)).unwrap().is_none());
    }

    #[test]
    fn test_first_page_urls_sorts_and_resolves() {
        let body = br#"[{"pageNumber":2,"imageUrl":"/b.jpg"},{"pageNumber":1,"imageUrl":"/a.jpg"},{"pageNumber":5}]"#;
        let urls = first_page_urls("http://api", body, 10).unwrap();
        assert_eq!(urls, vec!["http://api/a.jpg", "http://api/b.jpg"]);
    }

    #[test]
    fn test_prefetch_after_clear_writes_nothing() {
        let (store, fetcher, coordinator) = setup();
        let shared = &coordinator.handle.shared;
        fetcher.respond(&image_url(1), HttpResponse::ok(b"1".to_vec()));

        let stale_generation = shared.generation.load(Ordering::SeqCst);
        shared.generation.fetch_add(1, Ordering::SeqCst);
        prefetch_images(shared, &[image_url(1)], stale_generation);

        assert_eq!(store.entry_count("flipbook-v2-flipbook").unwrap(), 0);
    }

    #[test]
    fn test_status_after_drop_is_disconnected() {
        let (_store, _fetcher, coordinator) = setup();
        let handle = coordinator.handle();
        drop(coordinator);
        assert!(handle.status(Duration::from_millis(100)).is_err());
    }
}
