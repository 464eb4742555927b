//! Integration test fixtures for Rocket Cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocket-cart-integration-tests
//! ```
//!
//! No stock API or database is needed: the fixtures below stand in for the
//! engine's three collaborators.
//!
//! - [`FakeStockGateway`] - in-memory catalog and stock levels, with call
//!   counters and failure switches
//! - [`RecordingNotifier`] - captures every notification
//! - [`CountingStorage`] - in-memory slot storage that counts writes and can
//!   be told to fail them

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rocket_cart::{
    CartEngine, CartStore, GatewayError, MemoryStorage, Notifier, SlotStorage, StockGateway,
    StorageError,
};
use rocket_cart_core::{Cart, CartLine, Product, ProductId};
use rust_decimal::Decimal;

/// Slot name used by every fixture engine.
pub const CART_KEY: &str = "@RocketShoes:cart";

/// Engine assembled from the fixtures.
pub type TestEngine = CartEngine<FakeStockGateway, CountingStorage, RecordingNotifier>;

/// A product with a predictable title, price, and image.
#[must_use]
pub fn product(id: i32) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Tênis {id}"),
        price: Decimal::new(i64::from(id) * 1000 + 990, 2),
        image: format!("https://rocketshoes.test/{id}.jpg"),
    }
}

// =============================================================================
// Stock Gateway
// =============================================================================

/// In-memory stock API.
///
/// Cloning shares state, so a test can keep a handle and change stock after
/// the engine has taken ownership of its copy.
#[derive(Clone, Default)]
pub struct FakeStockGateway {
    state: Arc<GatewayState>,
}

#[derive(Default)]
struct GatewayState {
    stock: Mutex<HashMap<ProductId, u32>>,
    products: Mutex<HashMap<ProductId, Product>>,
    stock_calls: AtomicUsize,
    product_calls: AtomicUsize,
    fail_stock: AtomicBool,
    fail_product: AtomicBool,
    product_delay: Mutex<Option<Duration>>,
}

impl FakeStockGateway {
    /// Catalog where each `(id, stock)` pair is a product with that stock.
    #[must_use]
    pub fn with_stock(entries: &[(i32, u32)]) -> Self {
        let gateway = Self::default();
        for &(id, amount) in entries {
            gateway.set_stock(ProductId::new(id), amount);
            gateway.insert_product(product(id));
        }
        gateway
    }

    pub fn set_stock(&self, id: ProductId, amount: u32) {
        self.state.stock.lock().unwrap().insert(id, amount);
    }

    pub fn insert_product(&self, product: Product) {
        self.state
            .products
            .lock()
            .unwrap()
            .insert(product.id, product);
    }

    /// Make every stock lookup fail.
    pub fn fail_stock(&self, fail: bool) {
        self.state.fail_stock.store(fail, Ordering::SeqCst);
    }

    /// Hold every product lookup for `delay` before answering.
    pub fn delay_product(&self, delay: Duration) {
        *self.state.product_delay.lock().unwrap() = Some(delay);
    }

    /// Make every product lookup fail.
    pub fn fail_product(&self, fail: bool) {
        self.state.fail_product.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn stock_calls(&self) -> usize {
        self.state.stock_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn product_calls(&self) -> usize {
        self.state.product_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stock_of(&self, id: ProductId) -> u32 {
        self.state
            .stock
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl StockGateway for FakeStockGateway {
    async fn get_stock(&self, id: ProductId) -> Result<u32, GatewayError> {
        self.state.stock_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_stock.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "stock service unavailable".to_string(),
            });
        }
        self.state
            .stock
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .ok_or_else(|| GatewayError::NotFound(format!("stock {id}")))
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, GatewayError> {
        self.state.product_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.product_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_product.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "product service unavailable".to_string(),
            });
        }
        self.state
            .products
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("product {id}")))
    }

    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        let mut products: Vec<Product> = self
            .state
            .products
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// Captures notifications in order. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.messages.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

// =============================================================================
// Storage
// =============================================================================

/// [`MemoryStorage`] that counts successful writes and can fail them.
#[derive(Debug, Clone, Default)]
pub struct CountingStorage {
    inner: MemoryStorage,
    writes: usize,
    fail_writes: bool,
}

impl CountingStorage {
    #[must_use]
    pub fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            writes: 0,
            fail_writes: false,
        }
    }

    /// Storage whose cart slot already holds `(id, amount)` lines, built
    /// from [`product`].
    #[must_use]
    pub fn with_cart(lines: &[(i32, u32)]) -> Self {
        let cart = Cart::try_from(
            lines
                .iter()
                .map(|&(id, amount)| {
                    CartLine::with_amount(product(id), NonZeroU32::new(amount).unwrap())
                })
                .collect::<Vec<_>>(),
        )
        .unwrap();
        let raw = serde_json::to_string(&cart).unwrap();
        Self::new(MemoryStorage::with_slot(CART_KEY, raw))
    }

    /// Make every subsequent write fail.
    #[must_use]
    pub const fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    #[must_use]
    pub fn slot(&self, key: &str) -> Option<&str> {
        self.inner.slot(key)
    }

    #[must_use]
    pub fn into_inner(self) -> MemoryStorage {
        self.inner
    }
}

impl SlotStorage for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io {
                key: key.to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.set(key, value)?;
        self.writes += 1;
        Ok(())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Engine over `storage`, returning shared handles to the gateway and notifier.
#[must_use]
pub fn engine_with(
    gateway: &FakeStockGateway,
    storage: CountingStorage,
) -> (TestEngine, RecordingNotifier) {
    let notifier = RecordingNotifier::default();
    let engine = CartEngine::load(
        gateway.clone(),
        CartStore::new(storage, CART_KEY),
        notifier.clone(),
    );
    (engine, notifier)
}

/// Engine over empty storage.
#[must_use]
pub fn engine(gateway: &FakeStockGateway) -> (TestEngine, RecordingNotifier) {
    engine_with(gateway, CountingStorage::default())
}

/// The persisted slot parsed as JSON, or `None` if never written.
#[must_use]
pub fn stored_json(engine: &TestEngine) -> Option<serde_json::Value> {
    engine
        .store()
        .storage()
        .slot(CART_KEY)
        .map(|raw| serde_json::from_str(raw).unwrap())
}
