//! Order books and the quantities the strategy derives from them.

use super::money::{Cents, Size};

/// One price level: `(price_cents, size_contracts)`.
pub type PriceLevel = (Cents, Size);

/// Raw per-contract book as the exchange reports it: YES and NO bid ladders.
/// Ask sides are not transmitted directly — they are derived via the
/// `YES-ask(p) ≡ NO-bid(100−p)` identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    /// Sorted best-first (highest price first).
    pub yes_bids: Vec<PriceLevel>,
    /// Sorted best-first (highest price first).
    pub no_bids: Vec<PriceLevel>,
}

impl Book {
    #[must_use]
    pub fn best_yes_bid(&self) -> PriceLevel {
        self.yes_bids.first().copied().unwrap_or((0, 0))
    }

    #[must_use]
    pub fn best_no_bid(&self) -> PriceLevel {
        self.no_bids.first().copied().unwrap_or((0, 0))
    }

    /// `YES-ask(p) ≡ NO-bid(100−p)`: the best YES ask is `100 - best_no_bid`.
    /// Absent an opposing bid, the ask is unknown and defaults to 100
    /// (nothing is cheap enough to be a credible ask).
    #[must_use]
    pub fn best_yes_ask(&self) -> Cents {
        let (no_bid, _) = self.best_no_bid();
        if no_bid > 0 {
            100 - no_bid
        } else {
            100
        }
    }

    #[must_use]
    pub fn best_no_ask(&self) -> Cents {
        let (yes_bid, _) = self.best_yes_bid();
        if yes_bid > 0 {
            100 - yes_bid
        } else {
            100
        }
    }
}

/// Derived per-contract quantities the strategy and position manager consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketBook {
    pub best_yes_bid: Cents,
    pub best_yes_ask: Cents,
    pub best_no_bid: Cents,
    pub best_no_ask: Cents,
    pub min_bid_size: Size,
    pub seconds_until_close: i64,
}

impl MarketBook {
    #[must_use]
    pub fn from_book(book: &Book, seconds_until_close: i64) -> Self {
        let (yes_bid, yes_bid_size) = book.best_yes_bid();
        let (no_bid, no_bid_size) = book.best_no_bid();
        Self {
            best_yes_bid: yes_bid,
            best_yes_ask: book.best_yes_ask(),
            best_no_bid: no_bid,
            best_no_ask: book.best_no_ask(),
            min_bid_size: yes_bid_size.min(no_bid_size),
            seconds_until_close,
        }
    }

    #[must_use]
    pub fn combined_bid(&self) -> Cents {
        self.best_yes_bid + self.best_no_bid
    }

    #[must_use]
    pub fn spread_profit(&self) -> Cents {
        100 - self.combined_bid()
    }
}
