//! HTTP client for the stock/product REST API.
//!
//! # Endpoints
//!
//! - `GET {base}/stock/{id}` -> `{id, amount}`
//! - `GET {base}/products/{id}` -> `{id, title, price, image}`
//! - `GET {base}/products` -> `[{id, title, price, image}]`
//!
//! Uses `reqwest` for HTTP. Caches product metadata using `moka` when a
//! non-zero TTL is configured; stock is always fetched.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use rocket_cart_core::{Product, ProductId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::{GatewayError, StockGateway};
use crate::config::{ApiConfig, bearer_value};

/// Body of `GET /stock/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
struct StockRecord {
    id: ProductId,
    amount: u32,
}

/// Client for the stock/product API.
///
/// Cheaply cloneable; clones share the connection pool and cache.
#[derive(Clone)]
pub struct HttpStockGateway {
    inner: Arc<HttpStockGatewayInner>,
}

struct HttpStockGatewayInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl HttpStockGateway {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&bearer_value(token))
                .map_err(|e| GatewayError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let cache = (!config.product_cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(config.product_cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(HttpStockGatewayInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Resolve path segments against the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        endpoint(&self.inner.base_url, segments)
    }

    /// GET a URL and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, GatewayError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        decode_response(status, &body, what)
    }

    async fn cached(&self, key: CacheKey) -> Option<CacheValue> {
        match &self.inner.cache {
            Some(cache) => cache.get(&key).await,
            None => None,
        }
    }

    async fn remember(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }
}

#[async_trait]
impl StockGateway for HttpStockGateway {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_stock(&self, id: ProductId) -> Result<u32, GatewayError> {
        let url = self.endpoint(&["stock", &id.to_string()])?;
        let record: StockRecord = self.get_json(url, &format!("stock {id}")).await?;

        if record.id != id {
            return Err(GatewayError::UnexpectedProduct {
                requested: id,
                returned: record.id,
            });
        }

        debug!(available = record.amount, "Fetched stock");
        Ok(record.amount)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: ProductId) -> Result<Product, GatewayError> {
        let key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.cached(key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&["products", &id.to_string()])?;
        let product: Product = self.get_json(url, &format!("product {id}")).await?;

        if product.id != id {
            return Err(GatewayError::UnexpectedProduct {
                requested: id,
                returned: product.id,
            });
        }

        self.remember(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        if let Some(CacheValue::Products(products)) = self.cached(CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let url = self.endpoint(&["products"])?;
        let products: Vec<Product> = self.get_json(url, "products").await?;
        debug!(count = products.len(), "Fetched products");

        self.remember(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Append path segments to `base`, tolerating a trailing slash on the base.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| GatewayError::Parse(format!("Base URL cannot have paths: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map an HTTP status and body to a decoded value or a `GatewayError`.
fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    what: &str,
) -> Result<T, GatewayError> {
    if status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound(what.to_string()));
    }

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Stock API returned non-success status"
        );
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }

    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse stock API response"
        );
        GatewayError::Parse(format!("{what}: {e}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_endpoint_root_base() {
        let base = Url::parse("http://localhost:3333").unwrap();
        let url = endpoint(&base, &["stock", "1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3333/stock/1");
    }

    #[test]
    fn test_endpoint_nested_base() {
        let base = Url::parse("https://api.example.test/v1/").unwrap();
        let url = endpoint(&base, &["products", "42"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.test/v1/products/42");

        let base = Url::parse("https://api.example.test/v1").unwrap();
        let url = endpoint(&base, &["products"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.test/v1/products");
    }

    #[test]
    fn test_decode_stock_record() {
        let record: StockRecord =
            decode_response(StatusCode::OK, r#"{"id": 1, "amount": 3}"#, "stock 1").unwrap();
        assert_eq!(
            record,
            StockRecord {
                id: ProductId::new(1),
                amount: 3
            }
        );
    }

    #[test]
    fn test_decode_product() {
        let body = r#"{"id": 2, "title": "Tênis VR Caminhada", "price": 139.9, "image": "https://example.com/2.jpg"}"#;
        let product: Product = decode_response(StatusCode::OK, body, "product 2").unwrap();
        assert_eq!(product.id, ProductId::new(2));
        assert_eq!(product.price, Decimal::new(1399, 1));
    }

    #[test]
    fn test_decode_not_found() {
        let err = decode_response::<StockRecord>(StatusCode::NOT_FOUND, "{}", "stock 9").unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(ref what) if what == "stock 9"));
    }

    #[test]
    fn test_decode_server_error() {
        let err = decode_response::<StockRecord>(
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
            "stock 1",
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 500, ref message } if message == "boom"));
    }

    #[test]
    fn test_decode_malformed_body() {
        let err =
            decode_response::<StockRecord>(StatusCode::OK, r#"{"id": 1}"#, "stock 1").unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));

        let err = decode_response::<StockRecord>(StatusCode::OK, r#"{"id": 1, "amount": -2}"#, "stock 1")
            .unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }

    #[test]
    fn test_new_with_token() {
        let mut config = ApiConfig::new(Url::parse("http://localhost:3333").unwrap());
        config.token = Some(secrecy::SecretString::from("tK9$qW2!zR7@pL4#vN8&"));
        assert!(HttpStockGateway::new(&config).is_ok());
    }

    #[test]
    fn test_new_rejects_token_with_newline() {
        let mut config = ApiConfig::new(Url::parse("http://localhost:3333").unwrap());
        config.token = Some(secrecy::SecretString::from("abc\ndef"));
        assert!(matches!(
            HttpStockGateway::new(&config),
            Err(GatewayError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_disabled_with_zero_ttl() {
        let mut config = ApiConfig::new(Url::parse("http://localhost:3333").unwrap());
        config.product_cache_ttl = Duration::ZERO;
        let gateway = HttpStockGateway::new(&config).unwrap();

        gateway
            .remember(CacheKey::Products, CacheValue::Products(Vec::new()))
            .await;
        assert!(gateway.cached(CacheKey::Products).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_enabled() {
        let config = ApiConfig::new(Url::parse("http://localhost:3333").unwrap());
        let gateway = HttpStockGateway::new(&config).unwrap();

        let product = Product {
            id: ProductId::new(1),
            title: "Shoe".to_string(),
            price: Decimal::new(100, 0),
            image: "shoe.jpg".to_string(),
        };
        gateway
            .remember(
                CacheKey::Product(product.id),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;

        let hit = gateway.cached(CacheKey::Product(product.id)).await;
        assert!(matches!(hit, Some(CacheValue::Product(p)) if *p == product));
        assert!(gateway.cached(CacheKey::Products).await.is_none());
    }
}
