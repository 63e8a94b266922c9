//! Strategy output: an intent to place a pair.

use super::ids::PairId;
use super::money::{Cents, Dollars, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSignal {
    pub pair_id: PairId,
    pub ticker: String,
    pub asset: String,
    pub yes_price: Cents,
    pub no_price: Cents,
    pub size: Size,
    pub expected_profit: Dollars,
}

impl PairSignal {
    /// `(yes_price + no_price) * size / 100` dollars: what the maker must
    /// allocate before placing both legs.
    #[must_use]
    pub fn cost(&self) -> Dollars {
        super::money::cost_dollars(self.yes_price + self.no_price, self.size)
    }
}
