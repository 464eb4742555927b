//! Cart operation errors.
//!
//! Every engine operation returns `Result<(), CartError>`. The engine has
//! already notified the user by the time the caller sees the error; the value
//! is returned so callers can branch on the outcome (exit codes, retries).

use rocket_cart_core::ProductId;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::notify::messages;
use crate::store::StorageError;

/// Engine operations, used to choose the failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOperation {
    AddProduct,
    RemoveProduct,
    UpdateProductAmount,
}

impl CartOperation {
    /// Generic message for failures that are not stock rejections.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::AddProduct => messages::ADD_FAILED,
            Self::RemoveProduct => messages::REMOVE_FAILED,
            Self::UpdateProductAmount => messages::UPDATE_FAILED,
        }
    }
}

impl std::fmt::Display for CartOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddProduct => write!(f, "add_product"),
            Self::RemoveProduct => write!(f, "remove_product"),
            Self::UpdateProductAmount => write!(f, "update_product_amount"),
        }
    }
}

/// Why a cart operation was rejected.
#[derive(Debug, Error)]
pub enum CartError {
    /// The resulting amount would exceed the available stock.
    #[error("Requested {requested} of product {product_id}, only {available} in stock")]
    StockExceeded {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The product has no line in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    /// The stock gateway failed.
    #[error("Stock gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Persisting the new cart failed; the in-memory cart was not changed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CartError {
    /// The notification shown to the user for this error.
    #[must_use]
    pub const fn notification(&self, operation: CartOperation) -> &'static str {
        match self {
            Self::StockExceeded { .. } => messages::STOCK_EXCEEDED,
            Self::NotInCart(_) | Self::Gateway(_) | Self::Storage(_) => {
                operation.failure_message()
            }
        }
    }
}
