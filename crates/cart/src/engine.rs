//! The cart engine.
//!
//! Owns the canonical [`Cart`] and is the only thing that mutates it.
//! Each operation works on a copy of the cart, validates against a fresh
//! stock reading, then commits: the copy is persisted and, only if that
//! succeeds, becomes the in-memory cart. A rejected operation leaves both
//! untouched and notifies the user.
//!
//! # Line state machine
//!
//! ```text
//! ABSENT      --add_product-->            PRESENT(1)
//! PRESENT(n)  --add_product-->            PRESENT(n + 1)   n + 1 <= stock
//! PRESENT(n)  --update_product_amount-->  PRESENT(m)       1 <= m <= stock
//! PRESENT(n)  --remove_product-->         ABSENT
//! ```
//!
//! Operations take `&mut self`, so two operations can never interleave their
//! reads and commits of the cart. Dropping an operation's future before it
//! completes abandons it: nothing is committed and nobody is notified. The
//! commit itself has no await point.

use std::num::NonZeroU32;

use rocket_cart_core::{Cart, CartLine, DuplicateProduct, ProductId, QuantityIndex};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CartError, CartOperation};
use crate::gateway::{GatewayError, StockGateway};
use crate::notify::Notifier;
use crate::store::{CartStore, SlotStorage};

/// Arguments for [`CartEngine::update_product_amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    /// Target amount. Zero and negative values are ignored.
    pub amount: i32,
}

/// Stock-validated, persisted cart.
pub struct CartEngine<G, S, N> {
    cart: Cart,
    gateway: G,
    store: CartStore<S>,
    notifier: N,
}

impl<G, S, N> CartEngine<G, S, N>
where
    G: StockGateway,
    S: SlotStorage,
    N: Notifier,
{
    /// Create an engine whose cart is read from `store`.
    pub fn load(gateway: G, store: CartStore<S>, notifier: N) -> Self {
        let cart = store.load();
        info!(lines = cart.len(), "Cart loaded");
        Self {
            cart,
            gateway,
            store,
            notifier,
        }
    }

    /// Current cart snapshot.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Per-product amounts of the current cart.
    #[must_use]
    pub fn quantities(&self) -> QuantityIndex {
        self.cart.quantities()
    }

    /// Stock gateway used for stock and product lookups.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Store the cart is committed to.
    #[must_use]
    pub const fn store(&self) -> &CartStore<S> {
        &self.store
    }

    /// Sink that receives failure notifications.
    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Add one unit of a product.
    ///
    /// Stock is always queried, even when the product is already in the
    /// cart. A new line is created with the product's metadata and an amount
    /// of one; an existing line is incremented.
    ///
    /// # Errors
    ///
    /// - `StockExceeded` if one more unit would exceed the available stock
    /// - `Gateway` if the stock or product lookup fails
    /// - `Storage` if the new cart cannot be persisted
    ///
    /// The user has been notified whenever an error is returned.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let outcome = self.try_add_product(product_id).await;
        self.finish(CartOperation::AddProduct, outcome)
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// - `NotInCart` if the product has no line
    /// - `Storage` if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub fn remove_product(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let outcome = self.try_remove_product(product_id);
        self.finish(CartOperation::RemoveProduct, outcome)
    }

    /// Set a product's amount.
    ///
    /// Amounts of zero or less are ignored: no stock query, no write, no
    /// notification, and `Ok(())` is returned.
    ///
    /// # Errors
    ///
    /// - `StockExceeded` if the amount exceeds the available stock
    /// - `NotInCart` if the product has no line
    /// - `Gateway` if the stock lookup fails
    /// - `Storage` if the new cart cannot be persisted
    #[instrument(skip(self), fields(product_id = %update.product_id, amount = update.amount))]
    pub async fn update_product_amount(
        &mut self,
        update: UpdateProductAmount,
    ) -> Result<(), CartError> {
        let Some(amount) = u32::try_from(update.amount)
            .ok()
            .and_then(NonZeroU32::new)
        else {
            debug!("Ignoring non-positive amount");
            return Ok(());
        };

        let outcome = self.try_update_amount(update.product_id, amount).await;
        self.finish(CartOperation::UpdateProductAmount, outcome)
    }

    async fn try_add_product(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let available = self.gateway.get_stock(product_id).await?;
        let current = self.cart.amount_of(product_id);
        let requested = NonZeroU32::MIN.saturating_add(current);

        ensure_in_stock(product_id, requested, available)?;

        let mut next = self.cart.clone();
        if next.set_amount(product_id, requested).is_none() {
            let product = self.gateway.get_product(product_id).await?;
            if product.id != product_id {
                return Err(GatewayError::UnexpectedProduct {
                    requested: product_id,
                    returned: product.id,
                }
                .into());
            }
            next.push(CartLine::new(product))
                .map_err(|DuplicateProduct(returned)| GatewayError::UnexpectedProduct {
                    requested: product_id,
                    returned,
                })?;
        }

        self.commit(next)?;
        info!(amount = requested.get(), available, "Product added");
        Ok(())
    }

    fn try_remove_product(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let mut next = self.cart.clone();
        next.remove(product_id)
            .ok_or(CartError::NotInCart(product_id))?;

        self.commit(next)?;
        info!("Product removed");
        Ok(())
    }

    async fn try_update_amount(
        &mut self,
        product_id: ProductId,
        amount: NonZeroU32,
    ) -> Result<(), CartError> {
        let available = self.gateway.get_stock(product_id).await?;
        ensure_in_stock(product_id, amount, available)?;

        let mut next = self.cart.clone();
        next.set_amount(product_id, amount)
            .ok_or(CartError::NotInCart(product_id))?;

        self.commit(next)?;
        info!(available, "Product amount updated");
        Ok(())
    }

    /// Persist `next`, then make it the current cart.
    fn commit(&mut self, next: Cart) -> Result<(), CartError> {
        self.store.save(&next)?;
        self.cart = next;
        Ok(())
    }

    /// Log and notify a failed operation, passing the outcome through.
    fn finish(
        &self,
        operation: CartOperation,
        outcome: Result<(), CartError>,
    ) -> Result<(), CartError> {
        if let Err(err) = &outcome {
            match err {
                CartError::StockExceeded { .. } => info!(%operation, error = %err, "Rejected"),
                CartError::NotInCart(_) => warn!(%operation, error = %err, "Rejected"),
                CartError::Gateway(_) | CartError::Storage(_) => {
                    error!(%operation, error = %err, "Operation failed");
                }
            }
            self.notifier.error(err.notification(operation));
        }
        outcome
    }
}

fn ensure_in_stock(
    product_id: ProductId,
    requested: NonZeroU32,
    available: u32,
) -> Result<(), CartError> {
    if requested.get() > available {
        return Err(CartError::StockExceeded {
            product_id,
            requested: requested.get(),
            available,
        });
    }
    Ok(())
}
