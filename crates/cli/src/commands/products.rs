//! Catalog listing.

use std::fmt::Write as _;

use rocket_cart::StockGateway;
use rocket_cart_core::{CurrencyCode, Product, QuantityIndex};

use super::{CommandError, Engine};

/// Print every product with its price and in-cart quantity.
///
/// # Errors
///
/// Returns an error if the product list cannot be fetched.
pub async fn list(engine: &Engine, currency: CurrencyCode) -> Result<(), CommandError> {
    let products = engine.gateway().list_products().await?;
    let output = render(&products, &engine.quantities(), currency);

    #[allow(clippy::print_stdout)]
    {
        print!("{output}");
    }
    Ok(())
}

/// One row per product: id, title, unit price, and amount in the cart.
fn render(products: &[Product], quantities: &QuantityIndex, currency: CurrencyCode) -> String {
    if products.is_empty() {
        return "No products available.\n".to_string();
    }

    let mut out = String::new();
    for product in products {
        let _ = writeln!(
            out,
            "{:>4}  {:<40}  {:>14}  [{} in cart]",
            product.id,
            product.title,
            product.unit_price(currency).display(),
            quantities.get(product.id),
        );
    }
    out
}
