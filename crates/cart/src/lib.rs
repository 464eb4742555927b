//! Rocket Cart - stock-validated, persisted shopping cart.
//!
//! # Architecture
//!
//! - [`engine`] - `CartEngine` owns the cart and exposes add/remove/update
//! - [`gateway`] - `StockGateway` trait and the HTTP implementation
//! - [`store`] - `CartStore` persists the cart in a named key-value slot
//! - [`notify`] - `Notifier` sink for user-facing error messages
//! - [`config`] - Environment-driven configuration
//!
//! Control flow for every mutation: engine operation -> (stock query) ->
//! validate -> persist -> replace in-memory cart. Rejections notify the user
//! and leave the cart and its stored form untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use rocket_cart::{CartConfig, CartEngine, CartStore, FileStorage, HttpStockGateway, TracingNotifier};
//!
//! let config = CartConfig::from_env()?;
//! let gateway = HttpStockGateway::new(&config.api)?;
//! let store = CartStore::new(FileStorage::open(&config.storage.dir)?, config.storage.key.clone());
//! let mut engine = CartEngine::load(gateway, store, TracingNotifier);
//!
//! engine.add_product(ProductId::new(1)).await?;
//! println!("{} lines", engine.cart().len());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod store;

pub use config::{ApiConfig, CartConfig, ConfigError, StorageConfig};
pub use engine::{CartEngine, UpdateProductAmount};
pub use error::{CartError, CartOperation};
pub use gateway::{GatewayError, HttpStockGateway, StockGateway};
pub use notify::{Notifier, TracingNotifier};
pub use store::{CartStore, FileStorage, MemoryStorage, SlotStorage, StorageError};
