//! In-memory test doubles for the `Ledger` and `ExchangeClient` ports.
//! Exposed behind the `testkit` feature so integration tests in `tests/`
//! can exercise the engine without a SQLite file or network access.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{Book, Leg, LegStatus, Pair, PairStatus, PnlRecord, PnlSummary, Size};
use crate::error::{Error, Result};
use crate::port::exchange::{CancelOutcome, ExchangeMarket, ExchangeOrderAck, NewOrder};
use crate::port::{ExchangeClient, Ledger};

#[derive(Default)]
struct State {
    pairs: HashMap<crate::domain::PairId, Pair>,
    orders: HashMap<crate::domain::OrderId, Leg>,
    pnl: Vec<PnlRecord>,
    events: Vec<(String, Value, DateTime<Utc>)>,
}

/// A `Ledger` backed by in-process maps, guarded by a mutex so the trait's
/// `Send + Sync` bound is satisfiable without `unsafe`.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<State>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for InMemoryLedger {
    fn insert_pair(&self, pair: &Pair) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.pairs.contains_key(&pair.pair_id) {
            return Err(Error::Duplicate {
                kind: "pair",
                id: pair.pair_id.to_string(),
            });
        }
        state.pairs.insert(pair.pair_id, pair.clone());
        Ok(())
    }

    fn insert_order(&self, leg: &Leg) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.orders.contains_key(&leg.order_id) {
            return Err(Error::Duplicate {
                kind: "order",
                id: leg.order_id.to_string(),
            });
        }
        state.orders.insert(leg.order_id, leg.clone());
        Ok(())
    }

    fn update_pair_status(&self, pair_id: &crate::domain::PairId, status: PairStatus) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let pair = state
            .pairs
            .get_mut(pair_id)
            .ok_or_else(|| Error::BrokenInvariant(format!("unknown pair {pair_id}")))?;
        pair.status = status;
        Ok(())
    }

    fn update_order_status(&self, order_id: &crate::domain::OrderId, status: LegStatus, filled_size: Option<Size>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let leg = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| Error::BrokenInvariant(format!("unknown order {order_id}")))?;
        leg.status = status;
        if let Some(size) = filled_size {
            leg.filled_size = size;
        }
        Ok(())
    }

    fn append_pnl(&self, record: &PnlRecord) -> Result<()> {
        self.state.lock().unwrap().pnl.push(record.clone());
        Ok(())
    }

    fn append_event(&self, event_type: &str, details: Value, at: DateTime<Utc>) -> Result<()> {
        self.state.lock().unwrap().events.push((event_type.to_string(), details, at));
        Ok(())
    }

    fn open_pairs(&self) -> Result<Vec<Pair>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pairs
            .values()
            .filter(|p| matches!(p.status, PairStatus::Open))
            .cloned()
            .collect())
    }

    fn orders_for_pair(&self, pair_id: &crate::domain::PairId) -> Result<Vec<Leg>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .orders
            .values()
            .filter(|o| o.pair_id == *pair_id)
            .cloned()
            .collect())
    }

    fn open_orders(&self) -> Result<Vec<Leg>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .orders
            .values()
            .filter(|o| matches!(o.status, LegStatus::Open))
            .cloned()
            .collect())
    }

    fn get_order(&self, order_id: &crate::domain::OrderId) -> Result<Option<Leg>> {
        Ok(self.state.lock().unwrap().orders.get(order_id).cloned())
    }

    fn pnl_summary(&self) -> Result<PnlSummary> {
        let state = self.state.lock().unwrap();
        let count = state.pnl.len() as i64;
        let total_realized = state.pnl.iter().map(|r| r.realized_pnl).sum();
        let total_fees = state.pnl.iter().map(|r| r.fees).sum();
        let average_realized = if count > 0 {
            total_realized / rust_decimal::Decimal::from(count)
        } else {
            rust_decimal::Decimal::ZERO
        };
        Ok(PnlSummary {
            count,
            total_realized,
            total_fees,
            average_realized,
        })
    }

    fn recent_pairs(&self, limit: i64) -> Result<Vec<Pair>> {
        let state = self.state.lock().unwrap();
        let mut pairs: Vec<Pair> = state.pairs.values().cloned().collect();
        pairs.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        pairs.truncate(limit.max(0) as usize);
        Ok(pairs)
    }

    fn recent_pnl(&self, limit: i64) -> Result<Vec<PnlRecord>> {
        let state = self.state.lock().unwrap();
        let mut records = state.pnl.clone();
        records.sort_by_key(|r| std::cmp::Reverse(r.timestamp));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    fn recent_events(&self, limit: i64) -> Result<Vec<(String, Value, DateTime<Utc>)>> {
        let state = self.state.lock().unwrap();
        let mut events = state.events.clone();
        events.sort_by_key(|(_, _, at)| std::cmp::Reverse(*at));
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    fn count_by_status(&self, status: PairStatus) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pairs
            .values()
            .filter(|p| std::mem::discriminant(&p.status) == std::mem::discriminant(&status))
            .count() as i64)
    }
}

/// A scripted `ExchangeClient`: books and markets are fixed at construction;
/// placements/cancels always succeed unless `fail_cancels` is set.
pub struct StubExchange {
    pub markets: Mutex<Vec<ExchangeMarket>>,
    pub books: Mutex<HashMap<String, Book>>,
    pub fail_cancels: bool,
    pub next_order_id: Mutex<u64>,
}

impl StubExchange {
    #[must_use]
    pub fn new() -> Self {
        Self {
            markets: Mutex::new(Vec::new()),
            books: Mutex::new(HashMap::new()),
            fail_cancels: false,
            next_order_id: Mutex::new(1),
        }
    }

    pub fn with_book(self, ticker: impl Into<String>, book: Book) -> Self {
        self.books.lock().unwrap().insert(ticker.into(), book);
        self
    }
}

impl Default for StubExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for StubExchange {
    async fn list_markets(&self, series_ticker: &str, _status: &str, _limit: u32) -> Result<Vec<ExchangeMarket>> {
        Ok(self
            .markets
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.ticker.starts_with(series_ticker))
            .cloned()
            .collect())
    }

    async fn get_orderbook(&self, ticker: &str) -> Result<Book> {
        self.books
            .lock()
            .unwrap()
            .get(ticker)
            .cloned()
            .ok_or_else(|| Error::TransientIo(format!("no book for {ticker}")))
    }

    async fn place_order(&self, _order: &NewOrder) -> Result<ExchangeOrderAck> {
        let mut next = self.next_order_id.lock().unwrap();
        let id = *next;
        *next += 1;
        Ok(ExchangeOrderAck {
            exchange_order_id: format!("stub-{id}"),
        })
    }

    async fn cancel_order(&self, _exchange_order_id: &str) -> Result<CancelOutcome> {
        if self.fail_cancels {
            Err(Error::TransientIo("cancel rejected by stub".into()))
        } else {
            Ok(CancelOutcome::Cancelled)
        }
    }
}

