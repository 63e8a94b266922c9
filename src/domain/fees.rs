//! Exchange fee schedule.
//!
//! `maker_fee_cents(p, n) = ceil(0.0175 * n * (p/100) * (1 - p/100) * 100) / 100`
//! dollars, `p` in cents. `taker_fee_cents` uses 0.07 in place of 0.0175.
//! Only the maker rate applies to pair fills (legs rest post-only); the
//! taker rate is carried for the `status` CLI's fee-schedule display and for
//! symmetry with the exchange's published rate table.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::money::{Cents, Dollars, Size};

const MAKER_RATE: Decimal = dec!(0.0175);
const TAKER_RATE: Decimal = dec!(0.07);

fn fee_cents(rate: Decimal, price_cents: Cents, size: Size) -> Dollars {
    let p = Decimal::from(price_cents) / dec!(100);
    let raw_cents = rate * Decimal::from(size) * p * (Decimal::ONE - p) * dec!(100);
    raw_cents.ceil() / dec!(100)
}

/// Maker fee in dollars for `size` contracts resting at `price_cents`.
#[must_use]
pub fn maker_fee(price_cents: Cents, size: Size) -> Dollars {
    fee_cents(MAKER_RATE, price_cents, size)
}

/// Taker fee in dollars for `size` contracts taken at `price_cents`.
#[must_use]
pub fn taker_fee(price_cents: Cents, size: Size) -> Dollars {
    fee_cents(TAKER_RATE, price_cents, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maker_fee_rounds_up_to_the_cent() {
        // 0.0175 * 1 * 0.48 * 0.52 * 100 = 0.4368 cents -> rounds up to 1 cent.
        assert_eq!(maker_fee(48, 1), dec!(0.01));
        // 0.0175 * 10 * 0.48 * 0.52 * 100 = 4.368 cents -> rounds up to 5 cents.
        assert_eq!(maker_fee(48, 10), dec!(0.05));
    }

    #[test]
    fn maker_fee_is_symmetric_under_complementary_prices() {
        for p in 1..100i64 {
            assert_eq!(maker_fee(p, 3), maker_fee(100 - p, 3), "p={p}");
        }
    }

    #[test]
    fn taker_fee_uses_a_higher_rate_than_maker() {
        assert!(taker_fee(48, 1) > maker_fee(48, 1));
    }

    #[test]
    fn fee_is_zero_at_the_boundaries_only_in_the_limit() {
        // Price 1 and 99 are the thinnest legal prices but still non-zero fee.
        assert!(maker_fee(1, 100) > Decimal::ZERO);
        assert!(maker_fee(99, 100) > Decimal::ZERO);
    }
}
