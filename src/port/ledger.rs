//! Outbound port: the durable store (§4.1). Every method commits before
//! returning; a crash right after a call re-reads exactly that state.
//!
//! Methods are synchronous (not `async fn`): the concrete Diesel/SQLite
//! implementation never suspends, and keeping the trait synchronous means a
//! call never straddles an `.await` point, which matters for the
//! single-threaded cooperative model of §5 (no pair's ledger write is ever
//! interleaved with another's).

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{Leg, LegStatus, Pair, PairStatus, PnlRecord, PnlSummary};
use crate::error::Result;

pub trait Ledger: Send + Sync {
    fn insert_pair(&self, pair: &Pair) -> Result<()>;
    fn insert_order(&self, leg: &Leg) -> Result<()>;

    fn update_pair_status(&self, pair_id: &crate::domain::PairId, status: PairStatus) -> Result<()>;
    fn update_order_status(
        &self,
        order_id: &crate::domain::OrderId,
        status: LegStatus,
        filled_size: Option<crate::domain::Size>,
    ) -> Result<()>;

    fn append_pnl(&self, record: &PnlRecord) -> Result<()>;
    fn append_event(&self, event_type: &str, details: Value, at: DateTime<Utc>) -> Result<()>;

    fn open_pairs(&self) -> Result<Vec<Pair>>;
    fn orders_for_pair(&self, pair_id: &crate::domain::PairId) -> Result<Vec<Leg>>;
    fn open_orders(&self) -> Result<Vec<Leg>>;
    fn get_order(&self, order_id: &crate::domain::OrderId) -> Result<Option<Leg>>;

    fn pnl_summary(&self) -> Result<PnlSummary>;
    fn recent_pairs(&self, limit: i64) -> Result<Vec<Pair>>;
    fn recent_pnl(&self, limit: i64) -> Result<Vec<PnlRecord>>;
    fn recent_events(&self, limit: i64) -> Result<Vec<(String, Value, DateTime<Utc>)>>;
    fn count_by_status(&self, status: PairStatus) -> Result<i64>;
}
