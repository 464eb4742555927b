//! Cart inspection and mutation.
//!
//! Mutations print the resulting cart on success. On failure the engine has
//! already notified the user, so the error is only returned for the exit
//! status.

use std::fmt::Write as _;

use rocket_cart::UpdateProductAmount;
use rocket_cart_core::{Cart, CurrencyCode, ProductId};

use super::{CommandError, Engine};

/// Print the cart.
pub fn show(engine: &Engine, currency: CurrencyCode) {
    print_cart(engine.cart(), currency);
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns the engine's error after it has notified the user.
pub async fn add(
    engine: &mut Engine,
    product_id: ProductId,
    currency: CurrencyCode,
) -> Result<(), CommandError> {
    engine.add_product(product_id).await?;
    print_cart(engine.cart(), currency);
    Ok(())
}

/// Remove a product's line.
///
/// # Errors
///
/// Returns the engine's error after it has notified the user.
pub fn remove(
    engine: &mut Engine,
    product_id: ProductId,
    currency: CurrencyCode,
) -> Result<(), CommandError> {
    engine.remove_product(product_id)?;
    print_cart(engine.cart(), currency);
    Ok(())
}

/// Set a product's amount.
///
/// # Errors
///
/// Returns the engine's error after it has notified the user.
pub async fn update(
    engine: &mut Engine,
    product_id: ProductId,
    amount: i32,
    currency: CurrencyCode,
) -> Result<(), CommandError> {
    engine
        .update_product_amount(UpdateProductAmount { product_id, amount })
        .await?;
    print_cart(engine.cart(), currency);
    Ok(())
}

fn print_cart(cart: &Cart, currency: CurrencyCode) {
    let output = render(cart, currency);

    #[allow(clippy::print_stdout)]
    {
        print!("{output}");
    }
}

/// Lines in insertion order followed by a total.
fn render(cart: &Cart, currency: CurrencyCode) -> String {
    if cart.is_empty() {
        return "Cart is empty.\n".to_string();
    }

    let mut out = String::new();
    for line in cart {
        let _ = writeln!(
            out,
            "{:>4}  {:<40}  {:>3} x {:>12}  = {:>14}",
            line.id(),
            line.product.title,
            line.amount(),
            line.product.unit_price(currency).display(),
            line.subtotal(currency).display(),
        );
    }
    let _ = writeln!(
        out,
        "Total ({} units): {}",
        cart.total_units(),
        cart.subtotal(currency).display()
    );
    out
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use rocket_cart_core::{CartLine, Product};
    use rust_decimal::Decimal;

    use super::*;

    fn line(id: i32, price: Decimal, amount: u32) -> CartLine {
        let product = Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price,
            image: String::new(),
        };
        CartLine::with_amount(product, NonZeroU32::new(amount).expect("non-zero amount"))
    }

    #[test]
    fn test_render_empty_cart() {
        assert_eq!(render(&Cart::new(), CurrencyCode::BRL), "Cart is empty.\n");
    }

    #[test]
    fn test_render_lines_and_total() {
        let cart = Cart::try_from(vec![
            line(3, Decimal::new(10000, 2), 2),
            line(1, Decimal::new(5050, 2), 1),
        ])
        .expect("distinct products");

        let output = render(&cart, CurrencyCode::BRL);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Product 3"));
        assert!(lines[0].contains("R$ 200,00"));
        assert!(lines[1].contains("Product 1"));
        assert_eq!(lines[2], "Total (3 units): R$ 250,50");
    }

    #[test]
    fn test_render_uses_configured_currency() {
        let cart = Cart::try_from(vec![line(1, Decimal::new(123_456, 2), 1)])
            .expect("single line");

        let output = render(&cart, CurrencyCode::USD);
        assert!(output.ends_with("Total (1 units): $1,234.56\n"));
    }
}
