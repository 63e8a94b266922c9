//! Append-only realized-PnL records.

use chrono::{DateTime, Utc};

use super::ids::PairId;
use super::money::{Cents, Dollars, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlRecord {
    pub pair_id: PairId,
    pub ticker: String,
    pub yes_fill_price: Cents,
    pub no_fill_price: Cents,
    pub size: Size,
    pub combined_cost: Dollars,
    pub gross_profit: Dollars,
    pub fees: Dollars,
    pub realized_pnl: Dollars,
    pub timestamp: DateTime<Utc>,
}

/// Totals/averages/count over every `PnlRecord` ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PnlSummary {
    pub count: i64,
    pub total_realized: Dollars,
    pub total_fees: Dollars,
    pub average_realized: Dollars,
}
