//! Cache types for stock API responses.
//!
//! Only catalog data is cached. Stock levels never enter the cache.

use rocket_cart_core::{Product, ProductId};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}
