//! A catalog fetch running off the UI thread.
//!
//! The viewer polls [`CatalogRequest::poll`] from `tick`. Dropping a request
//! abandons it: a late answer is discarded.

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::mpsc::{self, Receiver, TryRecvError};
#[cfg(not(target_arch = "wasm32"))]
use std::thread;

use crate::error::{FlipbookError, ProviderError};
use crate::model::Catalog;
use crate::provider::PageDataProvider;

pub type CatalogResult = Result<Catalog, ProviderError>;

#[cfg(not(target_arch = "wasm32"))]
pub struct CatalogRequest {
    result_rx: Receiver<CatalogResult>,
}

#[cfg(not(target_arch = "wasm32"))]
impl CatalogRequest {
    /// Ask `provider` for catalog `id` (the featured one when `None`) on a new thread.
    pub fn spawn(
        provider: Arc<dyn PageDataProvider>,
        id: Option<String>,
    ) -> Result<Self, FlipbookError> {
        let (result_tx, result_rx) = mpsc::channel();
        thread::Builder::new()
            .name("catalog-request".to_string())
            .spawn(move || {
                let result = provider.fetch(id.as_deref());
                if result_tx.send(result).is_err() {
                    log::debug!("Catalog request abandoned before it finished");
                }
            })
            .map_err(|e| FlipbookError::Worker(e.to_string()))?;
        Ok(Self { result_rx })
    }

    /// The answer, once it has arrived. Non-blocking.
    pub fn poll(&mut self) -> Option<CatalogResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ProviderError::Network(
                "catalog request thread exited without an answer".to_string(),
            ))),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub struct CatalogRequest {
    slot: Rc<RefCell<Option<CatalogResult>>>,
}

#[cfg(target_arch = "wasm32")]
impl CatalogRequest {
    /// Fetch the provider's endpoint with `spawn_local`. Providers without an
    /// endpoint answer right away.
    pub fn spawn(
        provider: Arc<dyn PageDataProvider>,
        id: Option<String>,
    ) -> Result<Self, FlipbookError> {
        let slot = Rc::new(RefCell::new(None));
        match provider.endpoint(id.as_deref()) {
            None => *slot.borrow_mut() = Some(provider.fetch(id.as_deref())),
            Some(url) => {
                let target = Rc::clone(&slot);
                wasm_bindgen_futures::spawn_local(async move {
                    log::debug!("Fetching catalog from {}", url);
                    let result = match super::web_fetch::get(&url).await {
                        Ok(response) => provider.parse_response(&url, &response),
                        Err(e) => Err(e.into()),
                    };
                    *target.borrow_mut() = Some(result);
                });
            }
        }
        Ok(Self { slot })
    }

    pub fn poll(&mut self) -> Option<CatalogResult> {
        self.slot.borrow_mut().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Page;
    use crate::provider::StaticPageDataProvider;
    use std::time::{Duration, Instant};

    fn wait(request: &mut CatalogRequest) -> CatalogResult {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(result) = request.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "catalog request timed out");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_request_answers_from_thread() {
        let catalog = Catalog::new("c", "C", vec![Page::new(1, "http://h/1.png")]);
        let provider: Arc<dyn PageDataProvider> =
            Arc::new(StaticPageDataProvider::single(catalog));

        let mut featured = CatalogRequest::spawn(Arc::clone(&provider), None).unwrap();
        assert_eq!(wait(&mut featured).unwrap().id, "c");

        let mut missing = CatalogRequest::spawn(provider, Some("nope".to_string())).unwrap();
        assert!(matches!(wait(&mut missing), Err(ProviderError::Empty)));
    }
}
