//! `ExchangeClient` implementation against the Kalshi REST API: rate-limited,
//! RSA-PSS-signed HTTP over `reqwest`, with HTTP status mapped onto the
//! crate's error taxonomy (§6, §7).

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::auth::KalshiAuth;
use super::dto::{
    CreateOrderRequest, MarketsResponse, OrderResponse, OrderbookResponse, WireAction, WireSide, TIME_IN_FORCE_GTC,
};
use crate::domain::Book;
use crate::error::{Error, Result};
use crate::port::exchange::{CancelOutcome, ExchangeMarket, ExchangeOrderAck, NewOrder, OrderSide};
use crate::port::ExchangeClient;

type Limiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

pub struct KalshiClientConfig {
    pub base_url: String,
    pub api_key_id: String,
    pub private_key_pem: String,
    pub requests_per_minute: NonZeroU32,
    pub timeout_seconds: u64,
}

pub struct KalshiClient {
    base_url: String,
    http: Client,
    auth: KalshiAuth,
    rate_limiter: Arc<Limiter>,
}

impl KalshiClient {
    pub fn new(config: KalshiClientConfig) -> Result<Self> {
        let auth = KalshiAuth::new(config.api_key_id, &config.private_key_pem)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(Error::Http)?;
        let quota = Quota::per_minute(config.requests_per_minute);
        Ok(Self {
            base_url: config.base_url,
            http,
            auth,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    fn path(&self, suffix: &str) -> String {
        format!("/trade-api/v2{suffix}")
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, suffix: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;
        let path = self.path(suffix);
        let headers = self.auth.sign_request("GET", &path, "")?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(headers.as_tuples()[0].0, headers.as_tuples()[0].1)
            .header(headers.as_tuples()[1].0, headers.as_tuples()[1].1)
            .header(headers.as_tuples()[2].0, headers.as_tuples()[2].1)
            .send()
            .await
            .map_err(Error::Http)?;
        Self::handle_response(response).await
    }

    async fn post<T: serde::de::DeserializeOwned, B: Serialize>(&self, suffix: &str, body: &B) -> Result<T> {
        self.rate_limiter.until_ready().await;
        let path = self.path(suffix);
        let body_json = serde_json::to_string(body)?;
        let headers = self.auth.sign_request("POST", &path, &body_json)?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .header(headers.as_tuples()[0].0, headers.as_tuples()[0].1)
            .header(headers.as_tuples()[1].0, headers.as_tuples()[1].1)
            .header(headers.as_tuples()[2].0, headers.as_tuples()[2].1)
            .body(body_json)
            .send()
            .await
            .map_err(Error::Http)?;
        Self::handle_response(response).await
    }

    async fn delete(&self, suffix: &str) -> Result<StatusCode> {
        self.rate_limiter.until_ready().await;
        let path = self.path(suffix);
        let headers = self.auth.sign_request("DELETE", &path, "")?;
        let response = self
            .http
            .delete(format!("{}{}", self.base_url, path))
            .header(headers.as_tuples()[0].0, headers.as_tuples()[0].1)
            .header(headers.as_tuples()[1].0, headers.as_tuples()[1].1)
            .header(headers.as_tuples()[2].0, headers.as_tuples()[2].1)
            .send()
            .await
            .map_err(Error::Http)?;
        Ok(response.status())
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::AuthRequired {
                asset: "kalshi".into(),
                reason: text,
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::TransientIo(format!("{status}: {text}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::TransientIo(format!("{status}: {text}")));
        }
        response.json::<T>().await.map_err(Error::Http)
    }
}

#[async_trait]
impl ExchangeClient for KalshiClient {
    async fn list_markets(&self, series_ticker: &str, status: &str, limit: u32) -> Result<Vec<ExchangeMarket>> {
        let suffix = format!("/markets?series_ticker={series_ticker}&status={status}&limit={limit}");
        let response: MarketsResponse = self.get(&suffix).await?;
        Ok(response
            .markets
            .into_iter()
            .map(|m| ExchangeMarket {
                ticker: m.ticker,
                event_ticker: m.event_ticker,
                title: m.title,
                status: m.status,
                close_time: m.close_time,
            })
            .collect())
    }

    async fn get_orderbook(&self, ticker: &str) -> Result<Book> {
        let suffix = format!("/markets/{ticker}/orderbook?depth=20");
        let response: OrderbookResponse = self.get(&suffix).await?;

        let mut yes_bids: Vec<(i64, i64)> = response
            .orderbook
            .yes
            .unwrap_or_default()
            .into_iter()
            .map(|[price, size]| (price, size))
            .collect();
        let mut no_bids: Vec<(i64, i64)> = response
            .orderbook
            .no
            .unwrap_or_default()
            .into_iter()
            .map(|[price, size]| (price, size))
            .collect();
        yes_bids.sort_by(|a, b| b.0.cmp(&a.0));
        no_bids.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(Book { yes_bids, no_bids })
    }

    async fn place_order(&self, order: &NewOrder) -> Result<ExchangeOrderAck> {
        let (side, yes_price, no_price) = match order.side {
            OrderSide::Yes => (WireSide::Yes, Some(order.price_cents), None),
            OrderSide::No => (WireSide::No, None, Some(order.price_cents)),
        };
        let request = CreateOrderRequest {
            ticker: order.ticker.clone(),
            action: WireAction::Buy,
            side,
            order_type: "limit",
            count: order.size,
            yes_price,
            no_price,
            client_order_id: uuid::Uuid::new_v4().to_string(),
            time_in_force: TIME_IN_FORCE_GTC,
            post_only: true,
        };
        let response: OrderResponse = self.post("/portfolio/orders", &request).await?;
        Ok(ExchangeOrderAck {
            exchange_order_id: response.order.order_id,
        })
    }

    async fn cancel_order(&self, exchange_order_id: &str) -> Result<CancelOutcome> {
        let suffix = format!("/portfolio/orders/{exchange_order_id}");
        let status = self.delete(&suffix).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(CancelOutcome::AlreadyGone);
        }
        if !status.is_success() {
            return Err(Error::TransientIo(format!("cancel failed with status {status}")));
        }
        Ok(CancelOutcome::Cancelled)
    }
}
