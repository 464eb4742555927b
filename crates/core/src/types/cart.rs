//! The cart: an ordered, duplicate-free sequence of product lines.
//!
//! # Invariants
//!
//! - Lines keep the order in which their products were first added.
//! - A product appears in at most one line.
//! - Every line has an amount of at least one (enforced by `NonZeroU32`).
//!
//! Deserialization goes through the same checks, so a persisted value that
//! violates them is rejected rather than loaded.

use std::collections::HashMap;
use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::{CurrencyCode, Price};
use super::product::Product;

/// A product with a cart-local quantity.
///
/// Serialized flat as `{id, title, price, image, amount}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LineRecord", into = "LineRecord")]
pub struct CartLine {
    pub product: Product,
    pub amount: NonZeroU32,
}

/// Flat persisted form of a [`CartLine`].
///
/// Spelled out instead of `#[serde(flatten)]`: flattened fields are buffered
/// before decoding, which loses arbitrary-precision numbers.
#[derive(Serialize, Deserialize)]
struct LineRecord {
    id: ProductId,
    title: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    price: Decimal,
    image: String,
    amount: NonZeroU32,
}

impl From<LineRecord> for CartLine {
    fn from(record: LineRecord) -> Self {
        Self {
            product: Product {
                id: record.id,
                title: record.title,
                price: record.price,
                image: record.image,
            },
            amount: record.amount,
        }
    }
}

impl From<CartLine> for LineRecord {
    fn from(line: CartLine) -> Self {
        let CartLine { product, amount } = line;
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            image: product.image,
            amount,
        }
    }
}

impl CartLine {
    /// A fresh line holding a single unit.
    #[must_use]
    pub const fn new(product: Product) -> Self {
        Self {
            product,
            amount: NonZeroU32::MIN,
        }
    }

    /// Create a line with an explicit amount.
    #[must_use]
    pub const fn with_amount(product: Product, amount: NonZeroU32) -> Self {
        Self { product, amount }
    }

    /// The product identifier.
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }

    /// Quantity as a plain integer.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount.get()
    }

    /// `price * amount` in the given currency.
    #[must_use]
    pub fn subtotal(&self, currency_code: CurrencyCode) -> Price {
        Price::new(
            self.product.price * Decimal::from(self.amount.get()),
            currency_code,
        )
    }
}

/// Attempted to insert a second line for a product already in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("product {0} is already in the cart")]
pub struct DuplicateProduct(pub ProductId);

/// Ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// All lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.lines.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find the line for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Current amount for a product, `0` when absent.
    #[must_use]
    pub fn amount_of(&self, id: ProductId) -> u32 {
        self.get(id).map_or(0, CartLine::amount)
    }

    /// Append a new line at the end.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateProduct` if a line for the same product exists.
    pub fn push(&mut self, line: CartLine) -> Result<(), DuplicateProduct> {
        if self.contains(line.id()) {
            return Err(DuplicateProduct(line.id()));
        }
        self.lines.push(line);
        Ok(())
    }

    /// Set the amount of an existing line, returning the previous amount.
    ///
    /// Returns `None` (and changes nothing) when the product is not in the cart.
    pub fn set_amount(&mut self, id: ProductId, amount: NonZeroU32) -> Option<NonZeroU32> {
        self.lines
            .iter_mut()
            .find(|line| line.id() == id)
            .map(|line| std::mem::replace(&mut line.amount, amount))
    }

    /// Remove a line, keeping the relative order of the others.
    pub fn remove(&mut self, id: ProductId) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| line.id() == id)?;
        Some(self.lines.remove(index))
    }

    /// Per-product quantity lookup for listing views.
    #[must_use]
    pub fn quantities(&self) -> QuantityIndex {
        QuantityIndex(
            self.lines
                .iter()
                .map(|line| (line.id(), line.amount()))
                .collect(),
        )
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.amount())).sum()
    }

    /// Sum of every line's subtotal.
    #[must_use]
    pub fn subtotal(&self, currency_code: CurrencyCode) -> Price {
        let amount = self
            .lines
            .iter()
            .map(|line| line.subtotal(currency_code).amount)
            .sum();
        Price::new(amount, currency_code)
    }
}

impl TryFrom<Vec<CartLine>> for Cart {
    type Error = DuplicateProduct;

    fn try_from(lines: Vec<CartLine>) -> Result<Self, Self::Error> {
        let mut cart = Self::new();
        for line in lines {
            cart.push(line)?;
        }
        Ok(cart)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Product identifier to in-cart amount.
///
/// Products that are not in the cart read as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantityIndex(HashMap<ProductId, u32>);

impl QuantityIndex {
    #[must_use]
    pub fn get(&self, id: ProductId) -> u32 {
        self.0.get(&id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Decimal::new(1990, 2),
            image: format!("https://example.com/{id}.jpg"),
        }
    }

    fn amount(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero amount")
    }

    #[test]
    fn test_push_preserves_insertion_order() {
        let mut cart = Cart::new();
        cart.push(CartLine::new(product(3))).expect("push 3");
        cart.push(CartLine::new(product(1))).expect("push 1");
        cart.push(CartLine::new(product(2))).expect("push 2");

        let ids: Vec<i32> = cart.iter().map(|l| l.id().as_i32()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_push_rejects_duplicate() {
        let mut cart = Cart::new();
        cart.push(CartLine::new(product(1))).expect("push");
        let err = cart
            .push(CartLine::new(product(1)))
            .expect_err("duplicate push");
        assert_eq!(err, DuplicateProduct(ProductId::new(1)));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_set_amount() {
        let mut cart = Cart::new();
        cart.push(CartLine::new(product(1))).expect("push");

        assert_eq!(cart.set_amount(ProductId::new(1), amount(4)), Some(amount(1)));
        assert_eq!(cart.amount_of(ProductId::new(1)), 4);
        assert_eq!(cart.set_amount(ProductId::new(9), amount(2)), None);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut cart = Cart::new();
        for id in [1, 2, 3] {
            cart.push(CartLine::new(product(id))).expect("push");
        }

        let removed = cart.remove(ProductId::new(2)).expect("line 2");
        assert_eq!(removed.id(), ProductId::new(2));
        let ids: Vec<i32> = cart.iter().map(|l| l.id().as_i32()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(cart.remove(ProductId::new(2)).is_none());
    }

    #[test]
    fn test_quantities() {
        let mut cart = Cart::new();
        cart.push(CartLine::with_amount(product(1), amount(2)))
            .expect("push");
        cart.push(CartLine::with_amount(product(5), amount(7)))
            .expect("push");

        let index = cart.quantities();
        assert_eq!(index.get(ProductId::new(1)), 2);
        assert_eq!(index.get(ProductId::new(5)), 7);
        assert_eq!(index.get(ProductId::new(99)), 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_subtotal() {
        let mut cart = Cart::new();
        cart.push(CartLine::with_amount(product(1), amount(3)))
            .expect("push");
        cart.push(CartLine::new(product(2))).expect("push");

        assert_eq!(cart.total_units(), 4);
        assert_eq!(
            cart.subtotal(CurrencyCode::BRL).amount,
            Decimal::new(7960, 2)
        );
        assert_eq!(Cart::new().subtotal(CurrencyCode::USD).display(), "$0.00");
    }

    #[test]
    fn test_serialized_layout() {
        let mut cart = Cart::new();
        cart.push(CartLine::with_amount(product(1), amount(2)))
            .expect("push");

        let value = serde_json::to_value(&cart).expect("serialize");
        let line = &value[0];
        assert_eq!(line["id"], 1);
        assert_eq!(line["title"], "Product 1");
        assert_eq!(line["image"], "https://example.com/1.jpg");
        assert_eq!(line["amount"], 2);
        assert!(line["price"].is_number());
    }

    #[test]
    fn test_json_round_trip() {
        let mut cart = Cart::new();
        cart.push(CartLine::with_amount(product(4), amount(2)))
            .expect("push");
        cart.push(CartLine::new(product(1))).expect("push");

        let json = serde_json::to_string(&cart).expect("serialize");
        let restored: Cart = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_json_round_trip_keeps_exact_prices() {
        let mut precise = product(7);
        precise.price = Decimal::new(1_234_567_891_234_567_891, 10);
        let mut cart = Cart::new();
        cart.push(CartLine::with_amount(precise, amount(3)))
            .expect("push");

        let json = serde_json::to_string(&cart).expect("serialize");
        assert!(json.contains(r#""price":123456789.1234567891"#));

        let restored: Cart = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, cart);
        assert_eq!(
            restored.get(ProductId::new(7)).map(|l| l.product.price),
            Some(Decimal::new(1_234_567_891_234_567_891, 10))
        );
    }

    #[test]
    fn test_deserialize_rejects_duplicates_and_zero_amounts() {
        let duplicate = r#"[
            {"id": 1, "title": "A", "price": 1.5, "image": "a", "amount": 1},
            {"id": 1, "title": "A", "price": 1.5, "image": "a", "amount": 2}
        ]"#;
        assert!(serde_json::from_str::<Cart>(duplicate).is_err());

        let zero = r#"[{"id": 1, "title": "A", "price": 1.5, "image": "a", "amount": 0}]"#;
        assert!(serde_json::from_str::<Cart>(zero).is_err());
    }
}
