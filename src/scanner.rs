//! Market scanner (§4.3): discovers currently-open contracts for the
//! configured asset set and filters out those too close to resolution.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::Contract;
use crate::port::ExchangeClient;

pub struct MarketScanner {
    assets: Vec<String>,
    resolution_buffer_seconds: i64,
    /// Last-seen tickers, purged of expired entries each call. Exists only to
    /// suppress "new contract" log spam; rebuildable from scratch at any time.
    seen: HashMap<String, DateTime<Utc>>,
}

impl MarketScanner {
    #[must_use]
    pub fn new(assets: Vec<String>, resolution_buffer_seconds: i64) -> Self {
        Self {
            assets,
            resolution_buffer_seconds,
            seen: HashMap::new(),
        }
    }

    pub async fn scan(&mut self, exchange: &dyn ExchangeClient, now: DateTime<Utc>) -> Vec<Contract> {
        let mut contracts = Vec::new();

        for asset in &self.assets {
            match exchange.list_markets(asset, "open", 200).await {
                Ok(markets) => {
                    for market in markets {
                        if !market.ticker.starts_with(asset.as_str()) {
                            continue;
                        }
                        let contract = Contract::new(market.ticker.clone(), asset.clone(), market.close_time, now);
                        if contract.seconds_until_close <= self.resolution_buffer_seconds {
                            continue;
                        }
                        if !self.seen.contains_key(&contract.ticker) {
                            debug!(ticker = %contract.ticker, asset = %asset, "new contract discovered");
                        }
                        self.seen.insert(contract.ticker.clone(), market.close_time);
                        contracts.push(contract);
                    }
                }
                Err(err) => {
                    warn!(asset = %asset, error = %err, "market scan failed for asset, skipping");
                }
            }
        }

        self.seen.retain(|_, close_time| *close_time > now);
        contracts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Book;
    use crate::error::{Error, Result};
    use crate::port::{CancelOutcome, ExchangeMarket, NewOrder};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    struct StubExchange {
        markets: Mutex<Vec<ExchangeMarket>>,
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

        async fn get_orderbook(&self, _ticker: &str) -> Result<Book> {
            unimplemented!()
        }

        async fn place_order(&self, _order: &NewOrder) -> Result<crate::port::exchange::ExchangeOrderAck> {
            unimplemented!()
        }

        async fn cancel_order(&self, _exchange_order_id: &str) -> Result<CancelOutcome> {
            unimplemented!()
        }
    }

    fn market(ticker: &str, close_in_secs: i64, now: DateTime<Utc>) -> ExchangeMarket {
        ExchangeMarket {
            ticker: ticker.into(),
            event_ticker: ticker.into(),
            title: "test".into(),
            status: "open".into(),
            close_time: now + Duration::seconds(close_in_secs),
        }
    }

    #[tokio::test]
    async fn rejects_contracts_within_resolution_buffer() {
        let now = Utc::now();
        let exchange = StubExchange {
            markets: Mutex::new(vec![market("BTC-1", 60, now), market("BTC-2", 10_000, now)]),
        };
        let mut scanner = MarketScanner::new(vec!["BTC".into()], 120);
        let contracts = scanner.scan(&exchange, now).await;
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].ticker, "BTC-2");
    }

    #[tokio::test]
    async fn only_returns_contracts_matching_configured_assets() {
        let now = Utc::now();
        let exchange = StubExchange {
            markets: Mutex::new(vec![market("BTC-1", 10_000, now), market("ETH-1", 10_000, now)]),
        };
        let mut scanner = MarketScanner::new(vec!["BTC".into()], 120);
        let contracts = scanner.scan(&exchange, now).await;
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].asset, "BTC");
    }

    struct FailingExchange;

    #[async_trait]
    impl ExchangeClient for FailingExchange {
        async fn list_markets(&self, _series_ticker: &str, _status: &str, _limit: u32) -> Result<Vec<ExchangeMarket>> {
            Err(Error::TransientIo("connection reset".into()))
        }
        async fn get_orderbook(&self, _ticker: &str) -> Result<Book> {
            unimplemented!()
        }
        async fn place_order(&self, _order: &NewOrder) -> Result<crate::port::exchange::ExchangeOrderAck> {
            unimplemented!()
        }
        async fn cancel_order(&self, _exchange_order_id: &str) -> Result<CancelOutcome> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn a_failing_asset_scan_does_not_abort_the_whole_scan() {
        let now = Utc::now();
        let exchange = FailingExchange;
        let mut scanner = MarketScanner::new(vec!["BTC".into(), "ETH".into()], 120);
        let contracts = scanner.scan(&exchange, now).await;
        assert!(contracts.is_empty());
    }
}
