//! Subcommand implementations.

use rocket_cart::{
    CartConfig, CartEngine, CartError, CartStore, ConfigError, FileStorage, GatewayError,
    HttpStockGateway, StorageError, TracingNotifier,
};

pub mod cart;
pub mod products;

/// Engine wired to the HTTP stock API and the on-disk cart slot.
pub type Engine = CartEngine<HttpStockGateway, FileStorage, TracingNotifier>;

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Stock API error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Cart(#[from] CartError),
}

/// Build the engine from configuration, loading the persisted cart.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be created or the HTTP
/// client fails to build.
pub fn open_engine(config: &CartConfig) -> Result<Engine, CommandError> {
    let gateway = HttpStockGateway::new(&config.api)?;
    let storage = FileStorage::open(&config.storage.dir)?;
    let store = CartStore::new(storage, config.storage.key.clone());
    Ok(CartEngine::load(gateway, store, TracingNotifier))
}
