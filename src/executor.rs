//! Executor (§4.6): places and cancels paired quotes. Paper mode records
//! synthetic legs directly into the ledger; live mode round-trips through
//! the exchange.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{Leg, LegStatus, Pair, PairSignal, PairStatus, Side};
use crate::error::{Error, Result};
use crate::port::exchange::{CancelOutcome, NewOrder, OrderSide};
use crate::port::{ExchangeClient, IdSource, Ledger};

const CANCEL_RETRY_ATTEMPTS: u32 = 3;
const CANCEL_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct Executor {
    ledger: Arc<dyn Ledger>,
    exchange: Arc<dyn ExchangeClient>,
    paper_trade: bool,
}

impl Executor {
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>, exchange: Arc<dyn ExchangeClient>, paper_trade: bool) -> Self {
        Self {
            ledger,
            exchange,
            paper_trade,
        }
    }

    /// Places both legs of a signal. In live mode, a failed NO leg triggers a
    /// cancel of the acknowledged YES leg and the pair is marked CANCELLED
    /// rather than left straddling one live order.
    pub async fn place_pair(&self, signal: &PairSignal, ids: &mut dyn IdSource) -> Result<()> {
        let now = Utc::now();
        let pair = Pair {
            pair_id: signal.pair_id,
            ticker: signal.ticker.clone(),
            asset: signal.asset.clone(),
            target_spread: 100 - signal.yes_price - signal.no_price,
            status: PairStatus::Open,
            created_at: now,
            market_question: signal.ticker.clone(),
        };
        self.insert_pair_idempotent(&pair)?;

        let mut yes_leg = Leg::new(ids.next_order_id(), signal.pair_id, Side::Yes, signal.yes_price, signal.size, now);
        let mut no_leg = Leg::new(ids.next_order_id(), signal.pair_id, Side::No, signal.no_price, signal.size, now);

        if self.paper_trade {
            self.insert_order_idempotent(&yes_leg)?;
            self.insert_order_idempotent(&no_leg)?;
            info!(pair_id = %signal.pair_id, ticker = %signal.ticker, "paper pair placed");
            return Ok(());
        }

        let yes_ack = self
            .exchange
            .place_order(&NewOrder {
                ticker: signal.ticker.clone(),
                side: OrderSide::Yes,
                price_cents: signal.yes_price,
                size: signal.size,
            })
            .await;

        let yes_ack = match yes_ack {
            Ok(ack) => ack,
            Err(err) => {
                warn!(pair_id = %signal.pair_id, error = %err, "YES leg placement failed");
                self.ledger.update_pair_status(&signal.pair_id, PairStatus::Cancelled)?;
                return Err(err);
            }
        };
        yes_leg.exchange_order_id = Some(yes_ack.exchange_order_id);
        self.insert_order_idempotent(&yes_leg)?;

        let no_ack = self
            .exchange
            .place_order(&NewOrder {
                ticker: signal.ticker.clone(),
                side: OrderSide::No,
                price_cents: signal.no_price,
                size: signal.size,
            })
            .await;

        match no_ack {
            Ok(ack) => {
                no_leg.exchange_order_id = Some(ack.exchange_order_id);
                self.insert_order_idempotent(&no_leg)?;
                Ok(())
            }
            Err(err) => {
                warn!(pair_id = %signal.pair_id, error = %err, "NO leg placement failed, unwinding YES leg");
                if let Some(exchange_order_id) = &yes_leg.exchange_order_id {
                    let _ = self.cancel_on_exchange(exchange_order_id).await;
                }
                self.insert_order_idempotent(&no_leg)?;
                self.ledger.update_order_status(&yes_leg.order_id, LegStatus::Cancelled, None)?;
                self.ledger.update_order_status(&no_leg.order_id, LegStatus::Cancelled, None)?;
                self.ledger.update_pair_status(&signal.pair_id, PairStatus::Cancelled)?;
                Err(err)
            }
        }
    }

    /// Cancels one leg. Paper mode marks it CANCELLED directly; live mode
    /// cancels on the exchange first (with retry), treating 404 as success.
    pub async fn cancel_leg(&self, leg: &Leg) -> Result<()> {
        if self.paper_trade {
            self.ledger.update_order_status(&leg.order_id, LegStatus::Cancelled, None)?;
            return Ok(());
        }

        if let Some(exchange_order_id) = &leg.exchange_order_id {
            self.cancel_on_exchange(exchange_order_id).await?;
        }
        self.ledger.update_order_status(&leg.order_id, LegStatus::Cancelled, None)?;
        Ok(())
    }

    async fn cancel_on_exchange(&self, exchange_order_id: &str) -> Result<CancelOutcome> {
        let mut last_err = None;
        for attempt in 1..=CANCEL_RETRY_ATTEMPTS {
            match self.exchange.cancel_order(exchange_order_id).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) => {
                    warn!(exchange_order_id, attempt, error = %err, "cancel attempt failed");
                    last_err = Some(err);
                    if attempt < CANCEL_RETRY_ATTEMPTS {
                        tokio::time::sleep(CANCEL_RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::TransientIo("cancel retries exhausted".into())))
    }

    /// Cancels every leg the ledger currently reports as OPEN. Used on
    /// trading-halt and at shutdown.
    pub async fn cancel_all_open(&self) -> Result<usize> {
        let open = self.ledger.open_orders()?;
        let mut cancelled = 0;
        for leg in &open {
            if leg.is_open() {
                match self.cancel_leg(leg).await {
                    Ok(()) => cancelled += 1,
                    Err(err) => warn!(order_id = %leg.order_id, error = %err, "failed to cancel open leg"),
                }
            }
        }
        Ok(cancelled)
    }

    fn insert_pair_idempotent(&self, pair: &Pair) -> Result<()> {
        match self.ledger.insert_pair(pair) {
            Ok(()) => Ok(()),
            Err(err) if err.is_duplicate() => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn insert_order_idempotent(&self, leg: &Leg) -> Result<()> {
        match self.ledger.insert_order(leg) {
            Ok(()) => Ok(()),
            Err(err) if err.is_duplicate() => Ok(()),
            Err(err) => Err(err),
        }
    }
}
