//! Page data provider: where catalogs come from.

use std::sync::Arc;

use flipbook_cache::{Fetcher, HttpResponse};

use crate::error::ProviderError;
use crate::model::Catalog;

/// Source of catalogs. Returned catalogs are normalized (sorted, URLs resolved).
///
/// Providers are shared with the catalog request thread, hence `Send + Sync`.
pub trait PageDataProvider: Send + Sync {
    /// The catalog currently featured on the storefront.
    fn featured_catalog(&self) -> Result<Catalog, ProviderError>;

    /// A catalog by id.
    fn catalog(&self, id: &str) -> Result<Catalog, ProviderError>;

    /// The catalog `id` names, or the featured one.
    fn fetch(&self, id: Option<&str>) -> Result<Catalog, ProviderError> {
        match id {
            Some(id) => self.catalog(id),
            None => self.featured_catalog(),
        }
    }

    /// URL serving the catalog, for callers that fetch it themselves without
    /// blocking. `None` means the provider answers without the network.
    fn endpoint(&self, _id: Option<&str>) -> Option<String> {
        None
    }

    /// Turn the response fetched from [`PageDataProvider::endpoint`] into a catalog.
    fn parse_response(&self, url: &str, _response: &HttpResponse) -> Result<Catalog, ProviderError> {
        Err(ProviderError::Network(format!("{} is not a catalog endpoint", url)))
    }
}

/// Provider backed by the storefront REST API.
///
/// Blocking requests go through any [`Fetcher`], typically a cache handle so
/// catalog metadata gets stale-while-revalidate treatment. Without one the
/// provider only names endpoints and parses what the caller fetched.
pub struct HttpPageDataProvider {
    fetcher: Option<Arc<dyn Fetcher>>,
    api_url: String,
}

impl HttpPageDataProvider {
    pub fn new(fetcher: Arc<dyn Fetcher>, api_url: impl Into<String>) -> Self {
        Self {
            fetcher: Some(fetcher),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Provider for callers that fetch endpoints asynchronously.
    pub fn endpoints_only(api_url: impl Into<String>) -> Self {
        Self {
            fetcher: None,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn catalog_url(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!(
                "{}/api/flipbooks/{}",
                self.api_url,
                crate::links::percent_encode(id)
            ),
            None => format!("{}/api/flipbooks/featured/current", self.api_url),
        }
    }

    fn fetch_catalog(&self, url: &str) -> Result<Catalog, ProviderError> {
        let Some(fetcher) = self.fetcher.as_ref() else {
            return Err(ProviderError::Network(format!(
                "{} has to be fetched asynchronously",
                url
            )));
        };
        log::debug!("Fetching catalog from {}", url);
        let response = fetcher.get(url)?;
        self.parse_response(url, &response)
    }
}

impl PageDataProvider for HttpPageDataProvider {
    fn featured_catalog(&self) -> Result<Catalog, ProviderError> {
        self.fetch_catalog(&self.catalog_url(None))
    }

    fn catalog(&self, id: &str) -> Result<Catalog, ProviderError> {
        self.fetch_catalog(&self.catalog_url(Some(id)))
    }

    fn endpoint(&self, id: Option<&str>) -> Option<String> {
        Some(self.catalog_url(id))
    }

    fn parse_response(&self, url: &str, response: &HttpResponse) -> Result<Catalog, ProviderError> {
        if !response.is_success() {
            return Err(ProviderError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }

        // The featured endpoint answers `null` when nothing is featured.
        let catalog: Option<Catalog> = serde_json::from_slice(&response.body)?;
        let catalog = catalog.ok_or(ProviderError::Empty)?.normalized(&self.api_url);
        if catalog.is_empty() {
            return Err(ProviderError::Empty);
        }

        log::info!(
            "Loaded catalog '{}' ({}) with {} pages",
            catalog.title,
            catalog.id,
            catalog.len()
        );
        Ok(catalog)
    }
}

/// In-memory provider holding fixed catalogs. The first one is "featured".
#[derive(Default)]
pub struct StaticPageDataProvider {
    catalogs: Vec<Catalog>,
}

impl StaticPageDataProvider {
    pub fn new(catalogs: Vec<Catalog>) -> Self {
        Self { catalogs }
    }

    pub fn single(catalog: Catalog) -> Self {
        Self::new(vec![catalog])
    }
}

impl PageDataProvider for StaticPageDataProvider {
    fn featured_catalog(&self) -> Result<Catalog, ProviderError> {
        self.catalogs.first().cloned().ok_or(ProviderError::Empty)
    }

    fn catalog(&self, id: &str) -> Result<Catalog, ProviderError> {
        self.catalogs
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(ProviderError::Empty)
    }
}
