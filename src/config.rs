//! Engine configuration (§4.9, §6). Loaded from TOML with serde defaults;
//! credentials always come from the environment, never the config file.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

fn default_true() -> bool {
    true
}

fn default_min_spread_threshold() -> Decimal {
    Decimal::from(2)
}

fn default_order_size() -> i64 {
    15
}

fn default_max_exposure_per_market() -> Decimal {
    Decimal::from(100)
}

fn default_max_total_exposure() -> Decimal {
    Decimal::from(1000)
}

fn default_pair_timeout_seconds() -> i64 {
    45
}

fn default_resolution_buffer_seconds() -> i64 {
    120
}

fn default_cancel_deadline_seconds() -> i64 {
    90
}

fn default_scan_interval_seconds() -> u64 {
    10
}

fn default_max_one_sided_fills() -> u32 {
    3
}

fn default_assets() -> Vec<String> {
    vec!["BTC".into(), "ETH".into(), "SOL".into(), "XRP".into()]
}

fn default_database() -> String {
    "pairkeeper.db".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_api_url() -> String {
    "https://api.elections.kalshi.com/trade-api/v2".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_true")]
    pub paper_trade: bool,
    #[serde(default = "default_true")]
    pub trading_enabled: bool,
    #[serde(default = "default_min_spread_threshold")]
    pub min_spread_threshold: Decimal,
    #[serde(default = "default_order_size")]
    pub order_size_default: i64,
    #[serde(default = "default_max_exposure_per_market")]
    pub max_exposure_per_market: Decimal,
    #[serde(default = "default_max_total_exposure")]
    pub max_total_exposure: Decimal,
    #[serde(default = "default_pair_timeout_seconds")]
    pub pair_timeout_seconds: i64,
    #[serde(default = "default_resolution_buffer_seconds")]
    pub resolution_buffer_seconds: i64,
    #[serde(default = "default_cancel_deadline_seconds")]
    pub cancel_deadline_seconds: i64,
    #[serde(default = "default_scan_interval_seconds")]
    pub scan_interval_seconds: u64,
    #[serde(default = "default_max_one_sided_fills")]
    pub max_one_sided_fills_before_halt: u32,
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Requests per minute the exchange allows for one API key.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paper_trade: default_true(),
            trading_enabled: default_true(),
            min_spread_threshold: default_min_spread_threshold(),
            order_size_default: default_order_size(),
            max_exposure_per_market: default_max_exposure_per_market(),
            max_total_exposure: default_max_total_exposure(),
            pair_timeout_seconds: default_pair_timeout_seconds(),
            resolution_buffer_seconds: default_resolution_buffer_seconds(),
            cancel_deadline_seconds: default_cancel_deadline_seconds(),
            scan_interval_seconds: default_scan_interval_seconds(),
            max_one_sided_fills_before_halt: default_max_one_sided_fills(),
            assets: default_assets(),
            database: default_database(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            api_url: default_api_url(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

/// Credentials are never read from the TOML file; see `Credentials::from_env`.
#[derive(Clone)]
pub struct Credentials {
    pub api_key_id: String,
    pub private_key_pem: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let api_key_id = std::env::var("PAIRKEEPER_API_KEY_ID").map_err(|_| {
            ConfigError::MissingField {
                field: "PAIRKEEPER_API_KEY_ID",
            }
        })?;

        let private_key_pem = if let Ok(pem) = std::env::var("PAIRKEEPER_PRIVATE_KEY") {
            pem.replace("\\n", "\n")
        } else if let Ok(path) = std::env::var("PAIRKEEPER_PRIVATE_KEY_FILE") {
            std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?
        } else {
            return Err(ConfigError::MissingField {
                field: "PAIRKEEPER_PRIVATE_KEY",
            }
            .into());
        };

        Ok(Self {
            api_key_id,
            private_key_pem,
        })
    }
}

impl Config {
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn init_logging(&self) {
        crate::infra::logging::init(&self.log_level, &self.log_format);
    }

    fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            return Err(ConfigError::MissingField { field: "assets" }.into());
        }
        if self.scan_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan_interval_seconds",
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        if self.pair_timeout_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "pair_timeout_seconds",
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        if self.max_one_sided_fills_before_halt == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_one_sided_fills_before_halt",
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        if self.min_spread_threshold < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "min_spread_threshold",
                reason: "must be non-negative".into(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_asset_set() {
        let mut config = Config::default();
        config.assets.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_scan_interval() {
        let mut config = Config::default();
        config.scan_interval_seconds = 0;
        assert!(config.validate().is_err());
    }
}
