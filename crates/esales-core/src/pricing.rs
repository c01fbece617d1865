//! # Pricing
//!
//! Server-side order totals. The client computes its own total for display;
//! the stored total always comes from here.
//!
//! ```text
//! Product.price ($20.00) + Variant.price_adjustment (+$5.00) = unit ($25.00)
//!                                                                 │
//!                                                       × quantity (2)
//!                                                                 │
//!                                                                 ▼
//!                                                    total_amount ($50.00)
//! ```

use crate::money::Money;

/// Price of one unit: base price plus the variant's adjustment, if any.
#[inline]
pub fn unit_price(base: Money, adjustment: Option<Money>) -> Money {
    base + adjustment.unwrap_or_default()
}

/// Order total: `(base + adjustment) × quantity`.
///
/// ## Example
/// ```rust
/// use esales_core::money::Money;
/// use esales_core::pricing::order_total;
///
/// let total = order_total(Money::from_cents(2000), Some(Money::from_cents(500)), 2);
/// assert_eq!(total, Money::from_cents(5000));
/// ```
#[inline]
pub fn order_total(base: Money, adjustment: Option<Money>, quantity: i64) -> Money {
    unit_price(base, adjustment).multiply_quantity(quantity)
}

/// Whether a client-supplied total differs from the server total.
/// A missing client total is not a mismatch.
pub fn client_total_mismatch(client: Option<Money>, server: Money) -> bool {
    client.is_some_and(|c| c != server)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_total_with_adjustment() {
        let total = order_total(Money::from_cents(2000), Some(Money::from_cents(500)), 2);
        assert_eq!(total.cents(), 5000);
    }

    #[test]
    fn test_order_total_without_variant() {
        let total = order_total(Money::from_cents(2999), None, 3);
        assert_eq!(total.cents(), 8997);
    }

    #[test]
    fn test_negative_adjustment() {
        let total = order_total(Money::from_cents(2000), Some(Money::from_cents(-250)), 1);
        assert_eq!(total.cents(), 1750);
    }

    #[test]
    fn test_client_total_mismatch() {
        let server = Money::from_cents(5000);
        assert!(!client_total_mismatch(None, server));
        assert!(!client_total_mismatch(Some(Money::from_cents(5000)), server));
        assert!(client_total_mismatch(Some(Money::from_cents(1)), server));
    }
}
