//! Strategy (§4.5): a pure function from books to pair signals. No I/O, no
//! mutable state — every rejection rule is independently unit-testable.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::fees::maker_fee;
use crate::domain::{MarketBook, PairId, PairSignal, Size};
use crate::port::IdSource;

#[derive(Debug, Clone, Copy)]
pub struct StrategyConfig {
    pub min_spread_threshold: Decimal,
    pub order_size_default: Size,
    pub max_exposure_per_market: Decimal,
}

/// One book's verdict: a signal, or the rule number that rejected it.
/// `reject` is kept only for logging/debugging — callers generally just
/// want the surviving signals.
#[derive(Debug, Clone)]
pub enum Verdict {
    Signal(PairSignal),
    Reject { rule: u8 },
}

#[must_use]
pub fn evaluate(ticker: &str, asset: &str, book: &MarketBook, config: &StrategyConfig) -> Verdict {
    if book.best_yes_bid <= 0 || book.best_no_bid <= 0 {
        return Verdict::Reject { rule: 1 };
    }
    if book.seconds_until_close < 600 {
        return Verdict::Reject { rule: 2 };
    }
    if book.best_yes_bid < 10 || book.best_no_bid < 10 {
        return Verdict::Reject { rule: 3 };
    }
    if book.combined_bid() < 85 {
        return Verdict::Reject { rule: 4 };
    }
    if book.min_bid_size <= 0 {
        return Verdict::Reject { rule: 5 };
    }

    let profit_per_contract = net_profit_per_contract(book);

    if profit_per_contract < config.min_spread_threshold {
        return Verdict::Reject { rule: 6 };
    }

    let by_exposure = if book.combined_bid() > 0 {
        (config.max_exposure_per_market * dec_100() / Decimal::from(book.combined_bid()))
            .floor()
            .to_i64()
            .unwrap_or(0)
    } else {
        0
    };
    let size = config.order_size_default.min(by_exposure).min(book.min_bid_size);

    if size <= 0 {
        return Verdict::Reject { rule: 6 };
    }

    // `profit_per_contract` is cents-scale; the signal's `expected_profit` is
    // a dollar amount, so rescale before multiplying by size.
    let expected_profit = (profit_per_contract / dec_100()) * Decimal::from(size);

    Verdict::Signal(PairSignal {
        pair_id: PairId::new(uuid::Uuid::nil()),
        ticker: ticker.to_string(),
        asset: asset.to_string(),
        yes_price: book.best_yes_bid,
        no_price: book.best_no_bid,
        size,
        expected_profit,
    })
}

fn dec_100() -> Decimal {
    Decimal::from(100)
}

/// Runs `evaluate` over a whole batch and stamps fresh pair ids via the
/// injected `IdSource`, since `evaluate` itself stays pure and pinnable.
pub fn evaluate_batch(books: &[(String, String, MarketBook)], config: &StrategyConfig, ids: &mut dyn IdSource) -> Vec<PairSignal> {
    books
        .iter()
        .filter_map(|(ticker, asset, book)| match evaluate(ticker, asset, book, config) {
            Verdict::Signal(mut signal) => {
                signal.pair_id = ids.next_pair_id();
                Some(signal)
            }
            Verdict::Reject { .. } => None,
        })
        .collect()
}

/// Net profit per contract, in cents: `spread_profit` is already cents, and
/// the two `maker_fee(...)*100` terms rescale the dollar-denominated
/// `maker_fee` back to the same cents scale.
#[must_use]
pub fn net_profit_per_contract(book: &MarketBook) -> Decimal {
    Decimal::from(book.spread_profit()) - maker_fee(book.best_yes_bid, 1) * dec_100() - maker_fee(book.best_no_bid, 1) * dec_100()
}
