//! Wire types for the subset of the Kalshi REST API this adapter uses:
//! markets, orderbooks, order placement, and cancellation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct MarketsResponse {
    #[serde(default)]
    pub markets: Vec<RawMarket>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawMarket {
    pub ticker: String,
    pub event_ticker: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    pub close_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OrderbookResponse {
    pub orderbook: RawOrderbook,
}

/// `[[price_cents, count], ...]` per side, best-first is not guaranteed by
/// the wire format — the client sorts before handing it to the domain.
#[derive(Debug, Deserialize, Default)]
pub struct RawOrderbook {
    #[serde(default)]
    pub yes: Option<Vec<[i64; 2]>>,
    #[serde(default)]
    pub no: Option<Vec<[i64; 2]>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireSide {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireAction {
    Buy,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    pub ticker: String,
    pub action: WireAction,
    pub side: WireSide,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_price: Option<i64>,
    pub client_order_id: String,
    /// Always `"gtc"`: every order the engine places is good-till-cancelled.
    pub time_in_force: &'static str,
    /// Post-only: the engine only ever places passive maker quotes (§4.7).
    pub post_only: bool,
}

pub const TIME_IN_FORCE_GTC: &str = "gtc";

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub order: RawOrder,
}

#[derive(Debug, Deserialize)]
pub struct RawOrder {
    pub order_id: String,
    #[serde(default)]
    pub status: String,
}
