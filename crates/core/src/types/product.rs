//! Catalog product as served by the stock API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// A purchasable product.
///
/// Serialized as `{id, title, price, image}` with `price` as a JSON number
/// carrying every digit of the decimal, so values survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    /// Image URL.
    pub image: String,
}

impl Product {
    /// Unit price in the given currency.
    #[must_use]
    pub const fn unit_price(&self, currency_code: CurrencyCode) -> Price {
        Price::new(self.price, currency_code)
    }
}
