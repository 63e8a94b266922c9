//! Engine loop (§4.8): wires the seven components together, recovers state
//! on start, then drives the scan → fetch → manage → evaluate → place cycle
//! until a shutdown signal arrives.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};

use crate::book_fetcher::fetch_books;
use crate::capital::CapitalBook;
use crate::config::Config;
use crate::domain::event::kind;
use crate::domain::money::cost_dollars;
use crate::domain::{Contract, Leg, PairState, PairStatus};
use crate::error::Result;
use crate::executor::Executor;
use crate::port::{ExchangeClient, FillSampler, IdSource, Ledger, SystemRng};
use crate::position_manager::{PositionManager, PositionManagerConfig};
use crate::scanner::MarketScanner;
use crate::strategy::{evaluate, StrategyConfig, Verdict};

const SUMMARY_EVERY_N_CYCLES: u64 = 10;
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct Engine {
    config: Config,
    ledger: Arc<dyn Ledger>,
    exchange: Arc<dyn ExchangeClient>,
    executor: Executor,
    scanner: MarketScanner,
    position_manager: PositionManager,
    capital: CapitalBook,
    ids: Box<dyn IdSource>,
    sampler: Box<dyn FillSampler>,
    cycle_count: u64,
    trading_enabled: bool,
}

impl Engine {
    /// Connects the ledger, reconstructs the Capital Book from its OPEN
    /// pairs, then recovers any pairs left OPEN by a prior crash (§4.8).
    pub fn new(config: Config, ledger: Arc<dyn Ledger>, exchange: Arc<dyn ExchangeClient>) -> Result<Self> {
        let executor = Executor::new(ledger.clone(), exchange.clone(), config.paper_trade);
        let scanner = MarketScanner::new(config.assets.clone(), config.resolution_buffer_seconds);
        let mut capital = CapitalBook::new(config.max_total_exposure);

        for pair in ledger.open_pairs()? {
            let legs = ledger.orders_for_pair(&pair.pair_id)?;
            if let Ok([yes, no]) = <[Leg; 2]>::try_from(legs) {
                let cost = cost_dollars(yes.price_cents + no.price_cents, yes.size);
                let _ = capital.allocate(pair.pair_id, cost);
            }
        }

        let trading_enabled = config.trading_enabled;
        Ok(Self {
            config,
            ledger,
            exchange,
            executor,
            scanner,
            position_manager: PositionManager::new(),
            capital,
            ids: Box::new(SystemRng::new()),
            sampler: Box::new(SystemRng::new()),
            cycle_count: 0,
            trading_enabled,
        })
    }

    /// Branches per pair on recovery rather than the blanket cancel of the
    /// reference: a pair with one leg already FILLED books that exposure as
    /// a loss instead of silently erasing it (see SPEC_FULL.md §4.8/§9).
    pub async fn recover(&mut self) -> Result<()> {
        let now = Utc::now();
        for pair in self.ledger.open_pairs()? {
            let legs = self.ledger.orders_for_pair(&pair.pair_id)?;
            let legs: [Leg; 2] = match legs.try_into() {
                Ok(legs) => legs,
                Err(_) => {
                    warn!(pair_id = %pair.pair_id, "recovery found a pair without exactly two legs");
                    continue;
                }
            };
            let Some(state) = PairState::from_rows(pair.clone(), legs) else {
                warn!(pair_id = %pair.pair_id, "recovery found legs that do not form a valid YES/NO pair");
                continue;
            };

            let PairState::Open { yes, no, .. } = state else {
                continue;
            };

            match (yes.is_filled(), no.is_filled()) {
                (false, false) => {
                    if yes.is_open() {
                        self.executor.cancel_leg(&yes).await?;
                    }
                    if no.is_open() {
                        self.executor.cancel_leg(&no).await?;
                    }
                    self.ledger.update_pair_status(&pair.pair_id, PairStatus::Cancelled)?;
                    self.capital.release(pair.pair_id, Decimal::ZERO);
                    self.ledger
                        .append_event(kind::RECOVERY_CANCEL, json!({ "pair_id": pair.pair_id.to_string() }), now)?;
                    info!(pair_id = %pair.pair_id, "recovery: both legs open, cancelled");
                }
                (true, true) => {
                    let fees = crate::domain::fees::maker_fee(yes.price_cents, yes.size) + crate::domain::fees::maker_fee(no.price_cents, no.size);
                    let gross = cost_dollars(100 - yes.price_cents - no.price_cents, yes.size);
                    let net_pnl = gross - fees;
                    self.ledger.append_pnl(&crate::domain::PnlRecord {
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
                    self.ledger.update_pair_status(&pair.pair_id, PairStatus::Filled)?;
                    self.capital.release(pair.pair_id, net_pnl);
                    self.ledger
                        .append_event(kind::PAIR_COMPLETE, json!({ "pair_id": pair.pair_id.to_string() }), now)?;
                    info!(pair_id = %pair.pair_id, "recovery: both legs already filled, completed defensively");
                }
                _ => {
                    let (filled, open_leg) = if yes.is_filled() { (&yes, &no) } else { (&no, &yes) };
                    if open_leg.is_open() {
                        self.executor.cancel_leg(open_leg).await?;
                    }
                    self.ledger.update_pair_status(&pair.pair_id, PairStatus::Partial)?;
                    let exposure = cost_dollars(filled.price_cents, filled.size);
                    self.capital.release(pair.pair_id, -exposure);
                    self.ledger.append_event(
                        kind::RECOVERY_PARTIAL,
                        json!({ "pair_id": pair.pair_id.to_string(), "exposure": exposure.to_string() }),
                        now,
                    )?;
                    warn!(pair_id = %pair.pair_id, exposure = %exposure, "recovery: one leg filled, booked as loss");
                }
            }
        }
        Ok(())
    }

    /// Runs the main cycle until `shutdown` resolves, then cancels every
    /// remaining open leg and returns.
    pub async fn run(&mut self, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        loop {
            if let Err(err) = self.run_cycle().await {
                warn!(error = %err, "unhandled error in cycle, disabling trading and cancelling open orders");
                self.trading_enabled = false;
                self.executor.cancel_all_open().await?;
                return Err(err);
            }

            let mut slept = Duration::ZERO;
            let total = Duration::from_secs(self.config.scan_interval_seconds);
            loop {
                if slept >= total {
                    break;
                }
                let tick = SHUTDOWN_POLL_INTERVAL.min(total - slept);
                tokio::select! {
                    _ = tokio::time::sleep(tick) => { slept += tick; }
                    _ = &mut shutdown => {
                        info!("shutdown requested, finishing current state");
                        self.executor.cancel_all_open().await?;
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn run_cycle(&mut self) -> Result<()> {
        let now = Utc::now();
        let contracts = self.scanner.scan(self.exchange.as_ref(), now).await;
        if contracts.is_empty() {
            return Ok(());
        }

        let nearest = nearest_per_asset(&contracts);
        let open_tickers: Vec<String> = self.ledger.open_pairs()?.into_iter().map(|p| p.ticker).collect();

        let mut merged: Vec<Contract> = nearest.clone();
        for contract in &contracts {
            if open_tickers.contains(&contract.ticker) && !merged.iter().any(|c| c.ticker == contract.ticker) {
                merged.push(contract.clone());
            }
        }

        let books = fetch_books(self.exchange.as_ref(), &merged).await;

        let pm_config = PositionManagerConfig {
            max_one_sided_fills_before_halt: self.config.max_one_sided_fills_before_halt,
            cancel_deadline_seconds: self.config.cancel_deadline_seconds,
            pair_timeout_seconds: self.config.pair_timeout_seconds,
            paper_trade: self.config.paper_trade,
        };
        self.position_manager
            .check_pairs(
                self.ledger.as_ref(),
                &self.executor,
                &mut self.capital,
                &books,
                self.sampler.as_mut(),
                &pm_config,
                now,
            )
            .await?;

        if self.trading_enabled && !self.position_manager.halted() {
            self.evaluate_and_place(&nearest, &books, &open_tickers).await?;
        }

        self.cycle_count += 1;
        if self.cycle_count == 1 || self.cycle_count % SUMMARY_EVERY_N_CYCLES == 0 {
            let summary = self.capital.summary();
            info!(
                cycle = self.cycle_count,
                available = %summary.available,
                deployed = %summary.deployed,
                open_pairs = summary.open_pairs,
                halted = self.position_manager.halted(),
                "cycle summary"
            );
        }

        Ok(())
    }

    async fn evaluate_and_place(
        &mut self,
        nearest: &[Contract],
        books: &HashMap<String, crate::domain::MarketBook>,
        open_tickers: &[String],
    ) -> Result<()> {
        let strategy_config = StrategyConfig {
            min_spread_threshold: self.config.min_spread_threshold,
            order_size_default: self.config.order_size_default,
            max_exposure_per_market: self.config.max_exposure_per_market,
        };

        for contract in nearest {
            if open_tickers.contains(&contract.ticker) {
                continue;
            }
            let Some(book) = books.get(&contract.ticker) else {
                continue;
            };
            let Verdict::Signal(mut signal) = evaluate(&contract.ticker, &contract.asset, book, &strategy_config) else {
                continue;
            };
            signal.pair_id = self.ids.next_pair_id();

            let cost = signal.cost();
            if self.capital.can_allocate(cost) {
                self.capital.allocate(signal.pair_id, cost)?;
                if let Err(err) = self.executor.place_pair(&signal, self.ids.as_mut()).await {
                    warn!(ticker = %signal.ticker, error = %err, "pair placement failed");
                    self.capital.release(signal.pair_id, Decimal::ZERO);
                }
            }
        }
        Ok(())
    }
}

/// Sorts ascending by `seconds_until_close` and keeps at most one contract
/// per asset (the nearest to resolution).
fn nearest_per_asset(contracts: &[Contract]) -> Vec<Contract> {
    let mut sorted = contracts.to_vec();
    sorted.sort_by_key(|c| c.seconds_until_close);

    let mut seen = std::collections::HashSet::new();
    sorted.into_iter().filter(|c| seen.insert(c.asset.clone())).collect()
}
