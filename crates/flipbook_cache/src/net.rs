//! HTTP fetch seam used by the coordinator and the viewer.
//!
//! Everything that touches the network goes through the [`Fetcher`] trait so the
//! coordinator can sit in front of the real client and tests can script responses.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::NetError;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Synthetic 503 handed out when neither cache nor network can answer.
    pub fn unavailable(message: &str) -> Self {
        Self::with_status(503, message.as_bytes().to_vec()).with_content_type("text/plain")
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking GET of a URL.
///
/// Non-2xx answers are returned as `Ok` with their status; `Err` is reserved for
/// transport failures (DNS, refused connection, timeouts).
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, NetError>;
}

/// Resolve a possibly relative URL against a backend origin.
///
/// Absolute `http(s)` URLs pass through untouched.
pub fn resolve_url(base: &str, url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http") {
        return Some(url.to_string());
    }
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        Some(format!("{}{}", base, url))
    } else {
        Some(format!("{}/{}", base, url))
    }
}

/// Fetcher backed by a `ureq` agent (native only).
#[cfg(not(target_arch = "wasm32"))]
pub struct UreqFetcher {
    agent: ureq::Agent,
}

#[cfg(not(target_arch = "wasm32"))]
impl UreqFetcher {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(20);

    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }

    fn read_response(url: &str, response: ureq::Response) -> Result<HttpResponse, NetError> {
        use std::io::Read;

        let status = response.status();
        let content_type = Some(response.content_type().to_string());
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| NetError::new(url, e.to_string()))?;
        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for UreqFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Fetcher for UreqFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse, NetError> {
        log::trace!("GET {}", url);
        match self.agent.get(url).call() {
            Ok(response) => Self::read_response(url, response),
            Err(ureq::Error::Status(_, response)) => Self::read_response(url, response),
            Err(e) => Err(NetError::new(url, e.to_string())),
        }
    }
}

/// In-memory network with scripted answers.
///
/// Unknown URLs answer 404. Every request is recorded in order.
#[derive(Default)]
pub struct MemoryFetcher {
    routes: Mutex<HashMap<String, Result<HttpResponse, String>>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`.
    pub fn respond(&self, url: &str, response: HttpResponse) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), Ok(response));
        }
    }

    /// Fail `url` with a transport error.
    pub fn fail(&self, url: &str, message: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(url.to_string(), Err(message.to_string()));
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests made for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| u.as_str() == url).count()
    }
}

impl Fetcher for MemoryFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse, NetError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        let routes = self
            .routes
            .lock()
            .map_err(|_| NetError::new(url, "route table poisoned"))?;
        match routes.get(url) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(NetError::new(url, message.clone())),
            None => Ok(HttpResponse::with_status(404, b"not found".to_vec())),
        }
    }
}

impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    fn get(&self, url: &str) -> Result<HttpResponse, NetError> {
        (**self).get(url)
    }
}
