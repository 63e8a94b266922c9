//! Contracts discovered by the market scanner.

use chrono::{DateTime, Utc};

/// A currently-open contract on the exchange, as observed by one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub ticker: String,
    pub asset: String,
    pub close_time: DateTime<Utc>,
    /// Populated by the scanner relative to the instant of the scan.
    pub seconds_until_close: i64,
}

impl Contract {
    #[must_use]
    pub fn new(ticker: impl Into<String>, asset: impl Into<String>, close_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let seconds_until_close = (close_time - now).num_seconds();
        Self {
            ticker: ticker.into(),
            asset: asset.into(),
            close_time,
            seconds_until_close,
        }
    }
}
