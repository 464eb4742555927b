//! Persistent cart storage.
//!
//! # Layout
//!
//! The cart lives in a single named slot of a key-value store, serialized as
//! a JSON array of `{id, title, price, image, amount}` records. A missing
//! slot is an empty cart. The format is not versioned.
//!
//! [`SlotStorage`] is the key-value backend; [`CartStore`] binds a backend to
//! the cart slot and handles (de)serialization.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use rocket_cart_core::Cart;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on slot {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The cart could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The slot name cannot be mapped to the backend.
    #[error("Invalid slot key: {0}")]
    InvalidKey(String),
}

/// Durable key-value storage with atomic per-slot replacement.
pub trait SlotStorage {
    /// Read a slot. `Ok(None)` means the slot has never been written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace a slot's value. Readers observe either the old or the new
    /// value, never a partial write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// The cart slot on top of a [`SlotStorage`] backend.
#[derive(Debug, Clone)]
pub struct CartStore<S> {
    storage: S,
    key: String,
}

impl<S: SlotStorage> CartStore<S> {
    /// Bind `storage` to the slot named `key`.
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The slot name.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The underlying backend.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Read the persisted cart.
    ///
    /// An absent slot, an unreadable backend, or a value that does not parse
    /// as a valid cart all yield an empty cart; the latter two are logged.
    #[instrument(skip(self), fields(key = %self.key))]
    pub fn load(&self) -> Cart {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored cart, starting empty");
                return Cart::new();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored cart, starting empty");
                return Cart::new();
            }
        };

        match serde_json::from_str::<Cart>(&raw) {
            Ok(cart) => {
                debug!(lines = cart.len(), "Loaded stored cart");
                cart
            }
            Err(e) => {
                warn!(
                    error = %e,
                    value = %raw.chars().take(200).collect::<String>(),
                    "Stored cart is not valid, starting empty"
                );
                Cart::new()
            }
        }
    }

    /// Replace the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails; the
    /// previously stored value is left in place.
    #[instrument(skip(self, cart), fields(key = %self.key, lines = cart.len()))]
    pub fn save(&mut self, cart: &Cart) -> Result<(), StorageError> {
        let value = serde_json::to_string(cart)?;
        self.storage.set(&self.key, &value)?;
        debug!("Saved cart");
        Ok(())
    }
}
