//! Stock and product lookups.
//!
//! # Architecture
//!
//! - The stock API is the source of truth for availability: stock is queried
//!   fresh on every call and never cached
//! - Product metadata and the catalog listing may be cached by the
//!   implementation (see [`HttpStockGateway`])
//!
//! # Example
//!
//! ```rust,ignore
//! use rocket_cart::gateway::{HttpStockGateway, StockGateway};
//!
//! let gateway = HttpStockGateway::new(&config.api)?;
//!
//! let available = gateway.get_stock(ProductId::new(1)).await?;
//! let product = gateway.get_product(ProductId::new(1)).await?;
//! ```

mod cache;
mod http;

pub use http::HttpStockGateway;

use async_trait::async_trait;
use rocket_cart_core::{Product, ProductId};
use thiserror::Error;

/// Errors that can occur when talking to the stock API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The API answered with a record for a different product.
    #[error("Requested product {requested}, received {returned}")]
    UnexpectedProduct {
        requested: ProductId,
        returned: ProductId,
    },
}

/// Source of stock levels and product metadata.
#[async_trait]
pub trait StockGateway: Send + Sync {
    /// Units of `id` currently available.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the product is unknown or the API fails.
    async fn get_stock(&self, id: ProductId) -> Result<u32, GatewayError>;

    /// Metadata for `id`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the product is unknown or the API fails.
    async fn get_product(&self, id: ProductId) -> Result<Product, GatewayError>;

    /// Every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the API fails.
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError>;
}

#[async_trait]
impl<G: StockGateway + ?Sized> StockGateway for std::sync::Arc<G> {
    async fn get_stock(&self, id: ProductId) -> Result<u32, GatewayError> {
        (**self).get_stock(id).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, GatewayError> {
        (**self).get_product(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        (**self).list_products().await
    }
}
