//! Monetary and price representations.
//!
//! Prices and sizes on the wire are integer cents/contracts; dollar amounts
//! that accumulate (exposure, fees, PnL) use `Decimal` for exact cent-level
//! accounting instead of floating point.

use rust_decimal::Decimal;

/// Price of one contract side, in whole cents, always in `[1, 99]` for a
/// resting quote.
pub type Cents = i64;

/// Number of contracts.
pub type Size = i64;

/// A dollar amount, exact to the cent.
pub type Dollars = Decimal;

/// Convert a cents-per-contract price and a contract count into a dollar
/// amount: `price_cents * size / 100`.
#[must_use]
pub fn cost_dollars(price_cents: Cents, size: Size) -> Dollars {
    Decimal::from(price_cents) * Decimal::from(size) / Decimal::from(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cost_dollars_scales_cents_by_size() {
        assert_eq!(cost_dollars(48, 10), dec!(4.80));
        assert_eq!(cost_dollars(1, 1), dec!(0.01));
    }
}
