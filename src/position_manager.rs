//! Position manager (§4.7): the central state machine. Drives every OPEN
//! pair through simulation (paper mode), completion, deadline cancellation,
//! and one-sided-fill handling; owns the halt trigger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};

use crate::capital::CapitalBook;
use crate::domain::event::kind;
use crate::domain::fees::maker_fee;
use crate::domain::money::cost_dollars;
use crate::domain::{Leg, LegStatus, MarketBook, Pair, PairState, PairStatus, PnlRecord};
use crate::error::Result;
use crate::executor::Executor;
use crate::port::{FillSampler, Ledger};

#[derive(Debug, Clone, Copy)]
pub struct PositionManagerConfig {
    pub max_one_sided_fills_before_halt: u32,
    pub cancel_deadline_seconds: i64,
    pub pair_timeout_seconds: i64,
    pub paper_trade: bool,
}

pub struct PositionManager {
    consecutive_one_sided: u32,
    halted: bool,
}

impl PositionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            consecutive_one_sided: 0,
            halted: false,
        }
    }

    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn consecutive_one_sided(&self) -> u32 {
        self.consecutive_one_sided
    }

    pub async fn check_pairs(
        &mut self,
        ledger: &dyn Ledger,
        executor: &Executor,
        capital: &mut CapitalBook,
        books: &HashMap<String, MarketBook>,
        sampler: &mut dyn FillSampler,
        config: &PositionManagerConfig,
        now: DateTime<Utc>,
    ) -> Result<()> {
        for pair in ledger.open_pairs()? {
            if let Err(err) = self.process_pair(&pair, ledger, executor, capital, books, sampler, config, now).await {
                warn!(pair_id = %pair.pair_id, error = %err, "error while managing pair, leaving in prior state");
                ledger.append_event(
                    kind::BROKEN_INVARIANT,
                    json!({ "pair_id": pair.pair_id.to_string(), "reason": err.to_string() }),
                    now,
                )?;
            }
        }
        Ok(())
    }

    async fn process_pair(
        &mut self,
        pair: &Pair,
        ledger: &dyn Ledger,
        executor: &Executor,
        capital: &mut CapitalBook,
        books: &HashMap<String, MarketBook>,
        sampler: &mut dyn FillSampler,
        config: &PositionManagerConfig,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (yes0, no0) = open_legs(pair, ledger.orders_for_pair(&pair.pair_id)?)?;
        let book = books.get(&pair.ticker);

        if config.paper_trade {
            if let Some(book) = book {
                for leg in [&yes0, &no0] {
                    if leg.is_open() {
                        self.maybe_simulate_fill(leg, book, sampler, ledger)?;
                    }
                }
            }
        }

        let (yes, no) = open_legs(pair, ledger.orders_for_pair(&pair.pair_id)?)?;

        if yes.is_filled() && no.is_filled() {
            self.complete_pair(pair, &yes, &no, ledger, capital, now)?;
            return Ok(());
        }

        if let Some(book) = book {
            if book.seconds_until_close <= config.cancel_deadline_seconds {
                self.cancel_at_deadline(pair, &yes, &no, ledger, executor, capital, now).await?;
                return Ok(());
            }
        }

        let (filled, unfilled) = if yes.is_filled() && no.is_open() {
            (Some(&yes), Some(&no))
        } else if no.is_filled() && yes.is_open() {
            (Some(&no), Some(&yes))
        } else {
            (None, None)
        };

        if let (Some(filled_leg), Some(unfilled_leg)) = (filled, unfilled) {
            let age = (now - pair.created_at).num_seconds();
            if age >= config.pair_timeout_seconds {
                self.handle_one_sided_fill(pair, filled_leg, unfilled_leg, ledger, executor, capital, config, now)
                    .await?;
            }
        }

        Ok(())
    }

    fn maybe_simulate_fill(&self, leg: &Leg, book: &MarketBook, sampler: &mut dyn FillSampler, ledger: &dyn Ledger) -> Result<()> {
        let (best_bid, best_ask) = match leg.side {
            crate::domain::Side::Yes => (book.best_yes_bid, book.best_yes_ask),
            crate::domain::Side::No => (book.best_no_bid, book.best_no_ask),
        };

        let probability = fill_probability(best_bid, best_ask, leg.price_cents);
        if probability <= 0.0 {
            return Ok(());
        }

        if sampler.sample() < probability {
            ledger.update_order_status(&leg.order_id, LegStatus::Filled, Some(leg.size))?;
            info!(order_id = %leg.order_id, pair_id = %leg.pair_id, price = leg.price_cents, "paper fill simulated");
        }
        Ok(())
    }

    fn complete_pair(&mut self, pair: &Pair, yes: &Leg, no: &Leg, ledger: &dyn Ledger, capital: &mut CapitalBook, now: DateTime<Utc>) -> Result<()> {
        let fees = maker_fee(yes.price_cents, yes.size) + maker_fee(no.price_cents, no.size);
        let gross = cost_dollars(100 - yes.price_cents - no.price_cents, yes.size);
        let net_pnl = gross - fees;

        ledger.append_pnl(&PnlRecord {
            pair_id: pair.pair_id,
            ticker: pair.ticker.clone(),
            yes_fill_price: yes.price_cents,
            no_fill_price: no.price_cents,
            size: yes.size,
            combined_cost: cost_dollars(yes.price_cents + no.price_cents, yes.size),
            gross_profit: gross,
            fees,
            realized_pnl: net_pnl,
            timestamp: now,
        })?;
        ledger.update_pair_status(&pair.pair_id, PairStatus::Filled)?;
        ledger.append_event(kind::PAIR_COMPLETE, json!({ "pair_id": pair.pair_id.to_string(), "ticker": pair.ticker }), now)?;

        capital.release(pair.pair_id, net_pnl);
        self.consecutive_one_sided = 0;

        info!(pair_id = %pair.pair_id, ticker = %pair.ticker, realized_pnl = %net_pnl, "pair filled");
        Ok(())
    }

    async fn cancel_at_deadline(
        &mut self,
        pair: &Pair,
        yes: &Leg,
        no: &Leg,
        ledger: &dyn Ledger,
        executor: &Executor,
        capital: &mut CapitalBook,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let (filled, legs_to_cancel): (Option<&Leg>, Vec<&Leg>) = match (yes.is_filled(), no.is_filled()) {
            (true, false) => (Some(yes), vec![no]),
            (false, true) => (Some(no), vec![yes]),
            _ => (None, vec![yes, no].into_iter().filter(|l| l.is_open()).collect()),
        };

        for leg in &legs_to_cancel {
            if leg.is_open() {
                executor.cancel_leg(leg).await?;
            }
        }

        match filled {
            Some(filled_leg) => {
                ledger.update_pair_status(&pair.pair_id, PairStatus::Partial)?;
                let exposure = cost_dollars(filled_leg.price_cents, filled_leg.size);
                capital.release(pair.pair_id, -exposure);
            }
            None => {
                ledger.update_pair_status(&pair.pair_id, PairStatus::Cancelled)?;
                capital.release(pair.pair_id, Decimal::ZERO);
            }
        }

        ledger.append_event(
            kind::RESOLUTION_DEADLINE,
            json!({ "pair_id": pair.pair_id.to_string(), "ticker": pair.ticker }),
            now,
        )?;
        info!(pair_id = %pair.pair_id, ticker = %pair.ticker, "pair cancelled at resolution deadline");
        Ok(())
    }

    async fn handle_one_sided_fill(
        &mut self,
        pair: &Pair,
        filled_leg: &Leg,
        unfilled_leg: &Leg,
        ledger: &dyn Ledger,
        executor: &Executor,
        capital: &mut CapitalBook,
        config: &PositionManagerConfig,
        now: DateTime<Utc>,
    ) -> Result<()> {
        executor.cancel_leg(unfilled_leg).await?;
        ledger.update_pair_status(&pair.pair_id, PairStatus::Partial)?;
        self.consecutive_one_sided += 1;

        let exposure = cost_dollars(filled_leg.price_cents, filled_leg.size);
        capital.release(pair.pair_id, -exposure);

        ledger.append_event(
            kind::ONE_SIDED_FILL,
            json!({ "pair_id": pair.pair_id.to_string(), "ticker": pair.ticker, "exposure": exposure.to_string() }),
            now,
        )?;
        warn!(pair_id = %pair.pair_id, ticker = %pair.ticker, exposure = %exposure, "one-sided fill, exposure booked as loss");

        if self.consecutive_one_sided >= config.max_one_sided_fills_before_halt {
            self.halted = true;
            ledger.append_event(kind::TRADING_HALTED, json!({ "consecutive_one_sided": self.consecutive_one_sided }), now)?;
            warn!(consecutive_one_sided = self.consecutive_one_sided, "trading halted");
            executor.cancel_all_open().await?;
        }

        Ok(())
    }
}

impl Default for PositionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconstitutes the in-memory `PairState` for an OPEN ledger pair and
/// extracts its YES/NO legs, regardless of each leg's individual fill state.
fn open_legs(pair: &Pair, legs: Vec<Leg>) -> Result<(Leg, Leg)> {
    let legs: [Leg; 2] = legs
        .try_into()
        .map_err(|_| crate::error::Error::BrokenInvariant(format!("pair {} does not have exactly two legs", pair.pair_id)))?;
    let state = PairState::from_rows(pair.clone(), legs)
        .ok_or_else(|| crate::error::Error::BrokenInvariant(format!("pair {} legs do not form a valid YES/NO pair", pair.pair_id)))?;
    match state {
        PairState::Open { yes, no, .. } => Ok((yes, no)),
        other => Err(crate::error::Error::BrokenInvariant(format!(
            "pair {} is not OPEN but was returned by open_pairs()",
            other.pair().pair_id
        ))),
    }
}

/// Fill probability for one leg, per §4.7.1. `best_ask == 100` is the
/// sentinel for "no opposing bid, ask unknown" from `Book::best_yes_ask`/`best_no_ask`.
fn fill_probability(best_bid: crate::domain::Cents, best_ask: crate::domain::Cents, leg_price: crate::domain::Cents) -> f64 {
    if best_ask > 0 && best_ask <= leg_price {
        return 1.0;
    }
    if best_bid > 0 && leg_price >= best_bid {
        let spread = if best_ask == 100 { 10 } else { best_ask - best_bid };
        return if spread <= 2 {
            0.35
        } else if spread <= 5 {
            0.25
        } else {
            0.15
        };
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;
    use crate::executor::Executor;
    use crate::port::rng::ScriptedRng;
    use crate::testkit::{InMemoryLedger, StubExchange};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn seed_pair(ledger: &InMemoryLedger, ticker: &str, yes_price: i64, no_price: i64, size: i64, created_at: DateTime<Utc>) -> crate::domain::PairId {
        let pair_id = crate::domain::PairId::new(Uuid::new_v4());
        ledger
            .insert_pair(&Pair {
                pair_id,
                ticker: ticker.to_string(),
                asset: "BTC".into(),
                target_spread: 100 - yes_price - no_price,
                status: PairStatus::Open,
                created_at,
                market_question: ticker.to_string(),
            })
            .unwrap();
        ledger
            .insert_order(&Leg::new(crate::domain::OrderId::new(Uuid::new_v4()), pair_id, Side::Yes, yes_price, size, created_at))
            .unwrap();
        ledger
            .insert_order(&Leg::new(crate::domain::OrderId::new(Uuid::new_v4()), pair_id, Side::No, no_price, size, created_at))
            .unwrap();
        pair_id
    }

    fn config() -> PositionManagerConfig {
        PositionManagerConfig {
            max_one_sided_fills_before_halt: 3,
            cancel_deadline_seconds: 90,
            pair_timeout_seconds: 45,
            paper_trade: true,
        }
    }

    #[tokio::test]
    async fn happy_pair_fills_both_legs_and_books_pnl() {
        let ledger = Arc::new(InMemoryLedger::new());
        let exchange = Arc::new(StubExchange::new());
        let executor = Executor::new(ledger.clone(), exchange, true);
        let mut capital = CapitalBook::new(dec!(1000));
        let mut sampler = ScriptedRng::new([0.0, 0.0]);
        let mut pm = PositionManager::new();

        let now = Utc::now();
        let pair_id = seed_pair(&ledger, "KXBTC-1", 48, 49, 10, now);
        capital.allocate(pair_id, dec!(9.70)).unwrap();

        let mut books = HashMap::new();
        books.insert(
            "KXBTC-1".to_string(),
            MarketBook {
                best_yes_bid: 48,
                best_yes_ask: 48,
                best_no_bid: 49,
                best_no_ask: 49,
                min_bid_size: 10,
                seconds_until_close: 10_000,
            },
        );

        pm.check_pairs(ledger.as_ref(), &executor, &mut capital, &books, &mut sampler, &config(), now)
            .await
            .unwrap();

        let pairs = ledger.recent_pairs(10).unwrap();
        assert_eq!(pairs[0].status, PairStatus::Filled);
        let pnl = ledger.recent_pnl(10).unwrap();
        assert_eq!(pnl.len(), 1);
        assert_eq!(pnl[0].realized_pnl, dec!(0.20));
    }

    #[tokio::test]
    async fn one_sided_timeout_then_halt() {
        let ledger = Arc::new(InMemoryLedger::new());
        let exchange = Arc::new(StubExchange::new());
        let executor = Executor::new(ledger.clone(), exchange, true);
        let mut capital = CapitalBook::new(dec!(1000));
        let mut sampler = ScriptedRng::new([]);
        let mut pm = PositionManager::new();

        let created_at = Utc::now() - chrono::Duration::seconds(46);
        let pair_id = seed_pair(&ledger, "KXBTC-1", 48, 49, 10, created_at);
        capital.allocate(pair_id, dec!(9.70)).unwrap();

        let legs = ledger.orders_for_pair(&pair_id).unwrap();
        let yes_leg = legs.iter().find(|l| l.side == Side::Yes).unwrap();
        ledger.update_order_status(&yes_leg.order_id, LegStatus::Filled, Some(10)).unwrap();

        let cfg = PositionManagerConfig {
            max_one_sided_fills_before_halt: 1,
            cancel_deadline_seconds: 90,
            pair_timeout_seconds: 45,
            paper_trade: true,
        };

        pm.check_pairs(ledger.as_ref(), &executor, &mut capital, &HashMap::new(), &mut sampler, &cfg, Utc::now())
            .await
            .unwrap();

        let pairs = ledger.recent_pairs(10).unwrap();
        assert_eq!(pairs[0].status, PairStatus::Partial);
        assert!(pm.halted());
        assert_eq!(capital.summary().available, dec!(1000) - dec!(4.80));
    }

    #[tokio::test]
    async fn resolution_deadline_cancels_both_open_legs() {
        let ledger = Arc::new(InMemoryLedger::new());
        let exchange = Arc::new(StubExchange::new());
        let executor = Executor::new(ledger.clone(), exchange, true);
        let mut capital = CapitalBook::new(dec!(1000));
        let mut sampler = ScriptedRng::new([]);
        let mut pm = PositionManager::new();

        let now = Utc::now();
        let pair_id = seed_pair(&ledger, "KXBTC-1", 48, 49, 10, now);
        capital.allocate(pair_id, dec!(9.70)).unwrap();

        let mut books = HashMap::new();
        books.insert(
            "KXBTC-1".to_string(),
            MarketBook {
                best_yes_bid: 48,
                best_yes_ask: 52,
                best_no_bid: 49,
                best_no_ask: 51,
                min_bid_size: 10,
                seconds_until_close: 80,
            },
        );

        pm.check_pairs(ledger.as_ref(), &executor, &mut capital, &books, &mut sampler, &config(), now)
            .await
            .unwrap();

        let pairs = ledger.recent_pairs(10).unwrap();
        assert_eq!(pairs[0].status, PairStatus::Cancelled);
        assert_eq!(capital.summary().available, dec!(1000));
    }
}
