//! Flat row shapes for the four durable relations (§6). Conversions to and
//! from the in-memory domain types live in `sqlite_ledger`, not here.

use diesel::prelude::*;

use super::schema::{events, orders, pairs, pnl_log};

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = pairs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PairRow {
    pub pair_id: String,
    pub ticker: String,
    pub asset: String,
    pub target_spread: i64,
    pub status: String,
    pub created_at: String,
    pub market_question: String,
}

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub order_id: String,
    pub pair_id: String,
    pub ticker: String,
    pub side: String,
    pub price: i64,
    pub size: i64,
    pub status: String,
    pub exchange_order_id: Option<String>,
    pub filled_size: i64,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pnl_log)]
pub struct NewPnlRow {
    pub pair_id: String,
    pub ticker: String,
    pub yes_fill_price: i64,
    pub no_fill_price: i64,
    pub size: i64,
    pub combined_cost: String,
    pub gross_profit: String,
    pub fees: String,
    pub realized_pnl: String,
    pub timestamp: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pnl_log)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PnlRow {
    pub id: Option<i32>,
    pub pair_id: String,
    pub ticker: String,
    pub yes_fill_price: i64,
    pub no_fill_price: i64,
    pub size: i64,
    pub combined_cost: String,
    pub gross_profit: String,
    pub fees: String,
    pub realized_pnl: String,
    pub timestamp: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = events)]
pub struct NewEventRow {
    pub event_type: String,
    pub details_json: String,
    pub timestamp: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EventRow {
    pub id: Option<i32>,
    pub event_type: String,
    pub details_json: String,
    pub timestamp: String,
}
