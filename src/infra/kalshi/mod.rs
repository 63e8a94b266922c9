//! Kalshi-shaped exchange adapter (§4.2, §6): request signing, wire types,
//! and the `ExchangeClient` implementation over `reqwest`.

pub mod auth;
pub mod client;
pub mod dto;

pub use client::{KalshiClient, KalshiClientConfig};
