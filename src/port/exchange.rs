//! Outbound port: what the engine needs from an exchange. Concrete Kalshi-shaped
//! transport lives in `infra::kalshi`; tests use an in-memory stub.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Book, Cents, Size};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeMarket {
    pub ticker: String,
    pub event_ticker: String,
    pub title: String,
    pub status: String,
    pub close_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub ticker: String,
    pub side: OrderSide,
    pub price_cents: Cents,
    pub size: Size,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOrderAck {
    pub exchange_order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The exchange no longer knows this order (HTTP 404); treated as success.
    AlreadyGone,
}

/// The four exchange operations the engine depends on (§6).
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// `list_markets(series_ticker, status, limit)`.
    async fn list_markets(&self, series_ticker: &str, status: &str, limit: u32) -> Result<Vec<ExchangeMarket>>;

    async fn get_orderbook(&self, ticker: &str) -> Result<Book>;

    /// Post-only limit buy, time-in-force good-till-cancelled.
    async fn place_order(&self, order: &NewOrder) -> Result<ExchangeOrderAck>;

    async fn cancel_order(&self, exchange_order_id: &str) -> Result<CancelOutcome>;
}
