//! Product list source used for post-event re-fetches.

use crate::error::FetchError;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use vitrine_types::{CategoryId, Product, StoreId};

/// Timeout for one catalog request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Loads the product list currently displayed by a view.
pub trait ProductSource: Send + Sync + 'static {
    /// Fetches the products of `store_id`, filtered by `category` when given.
    fn fetch_products(
        &self,
        store_id: &StoreId,
        category: Option<&CategoryId>,
    ) -> impl Future<Output = Result<Vec<Product>, FetchError>> + Send;
}

impl<T: ProductSource> ProductSource for Arc<T> {
    fn fetch_products(
        &self,
        store_id: &StoreId,
        category: Option<&CategoryId>,
    ) -> impl Future<Output = Result<Vec<Product>, FetchError>> + Send {
        (**self).fetch_products(store_id, category)
    }
}

/// The API returns either a bare array or an object with a `data` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProductsBody {
    Bare(Vec<Product>),
    Wrapped { data: Vec<Product> },
}

impl ProductsBody {
    fn into_products(self) -> Vec<Product> {
        match self {
            Self::Bare(products) | Self::Wrapped { data: products } => products,
        }
    }
}

/// Remote catalog over HTTP: `GET {base}/stores/{store}/products[?category_id=…]`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpCatalog {
    /// Creates a catalog client. `token` is sent as a bearer token when present.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: Url, token: Option<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Builds the product list URL for a store and optional category.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::CannotBeABase`] if the base URL has no path.
    pub fn products_url(
        &self,
        store_id: &StoreId,
        category: Option<&CategoryId>,
    ) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["stores", store_id.as_str(), "products"]);
        if let Some(category) = category {
            url.query_pairs_mut()
                .append_pair("category_id", category.as_str());
        }
        Ok(url)
    }
}

impl ProductSource for HttpCatalog {
    async fn fetch_products(
        &self,
        store_id: &StoreId,
        category: Option<&CategoryId>,
    ) -> Result<Vec<Product>, FetchError> {
        let url = self.products_url(store_id, category)?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        let products = serde_json::from_slice::<ProductsBody>(&body)?.into_products();
        tracing::debug!(store_id = %store_id, count = products.len(), "fetched product list");
        Ok(products)
    }
}
