//! Diesel/SQLite implementation of the `Ledger` port (§4.1). Every method is
//! one committed transaction; `synchronous = FULL` (set on pool connections
//! via `configure_sqlite_connection`) ensures a crash right after a call
//! re-reads exactly that state.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;
use serde_json::Value;

use super::db::model::{EventRow, NewEventRow, NewPnlRow, OrderRow, PairRow, PnlRow};
use super::db::schema::{events, orders, pairs, pnl_log};
use super::db::DbPool;
use crate::domain::{Leg, LegStatus, OrderId, Pair, PairId, PairStatus, PnlRecord, PnlSummary, Side, Size};
use crate::error::{Error, Result};
use crate::port::Ledger;

pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn pair_row(pair: &Pair) -> PairRow {
        PairRow {
            pair_id: pair.pair_id.to_string(),
            ticker: pair.ticker.clone(),
            asset: pair.asset.clone(),
            target_spread: pair.target_spread,
            status: pair.status.as_str().to_string(),
            created_at: pair.created_at.to_rfc3339(),
            market_question: pair.market_question.clone(),
        }
    }

    fn pair_from_row(row: PairRow) -> Result<Pair> {
        Ok(Pair {
            pair_id: parse_id::<PairId>(&row.pair_id)?,
            ticker: row.ticker,
            asset: row.asset,
            target_spread: row.target_spread,
            status: PairStatus::from_str(&row.status).map_err(Error::BrokenInvariant)?,
            created_at: parse_timestamp(&row.created_at)?,
            market_question: row.market_question,
        })
    }

    fn order_row(leg: &Leg, ticker: &str) -> OrderRow {
        OrderRow {
            order_id: leg.order_id.to_string(),
            pair_id: leg.pair_id.to_string(),
            ticker: ticker.to_string(),
            side: leg.side.as_str().to_string(),
            price: leg.price_cents,
            size: leg.size,
            status: leg.status.as_str().to_string(),
            exchange_order_id: leg.exchange_order_id.clone(),
            filled_size: leg.filled_size,
            created_at: leg.created_at.to_rfc3339(),
        }
    }

    fn leg_from_row(row: OrderRow) -> Result<Leg> {
        Ok(Leg {
            order_id: parse_id::<OrderId>(&row.order_id)?,
            pair_id: parse_id::<PairId>(&row.pair_id)?,
            side: match row.side.as_str() {
                "yes" => Side::Yes,
                "no" => Side::No,
                other => return Err(Error::BrokenInvariant(format!("unknown leg side: {other}"))),
            },
            price_cents: row.price,
            size: row.size,
            status: LegStatus::from_str(&row.status).map_err(Error::BrokenInvariant)?,
            filled_size: row.filled_size,
            exchange_order_id: row.exchange_order_id,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }

    fn pnl_from_row(row: PnlRow) -> Result<PnlRecord> {
        Ok(PnlRecord {
            pair_id: parse_id::<PairId>(&row.pair_id)?,
            ticker: row.ticker,
            yes_fill_price: row.yes_fill_price,
            no_fill_price: row.no_fill_price,
            size: row.size,
            combined_cost: parse_decimal(&row.combined_cost)?,
            gross_profit: parse_decimal(&row.gross_profit)?,
            fees: parse_decimal(&row.fees)?,
            realized_pnl: parse_decimal(&row.realized_pnl)?,
            timestamp: parse_timestamp(&row.timestamp)?,
        })
    }

    fn ticker_for_pair(conn: &mut SqliteConnection, pair_id: &PairId) -> Result<String> {
        pairs::table
            .find(pair_id.to_string())
            .select(pairs::ticker)
            .first(conn)
            .map_err(map_diesel_err)
    }
}

fn parse_id<T: FromStr>(s: &str) -> Result<T> {
    T::from_str(s).map_err(|_| Error::BrokenInvariant(format!("invalid id: {s}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::BrokenInvariant(format!("invalid timestamp {s}: {e}")))
}

fn parse_decimal(s: &str) -> Result<rust_decimal::Decimal> {
    s.parse().map_err(|e| Error::BrokenInvariant(format!("invalid decimal {s}: {e}")))
}

fn map_diesel_err(err: DieselError) -> Error {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => Error::Duplicate {
            kind: "row",
            id: info.message().to_string(),
        },
        DieselError::NotFound => Error::BrokenInvariant("expected row not found".into()),
        other => Error::Database(other),
    }
}

impl Ledger for SqliteLedger {
    fn insert_pair(&self, pair: &Pair) -> Result<()> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(pairs::table)
            .values(Self::pair_row(pair))
            .execute(&mut conn)
            .map_err(map_diesel_err)?;
        Ok(())
    }

    fn insert_order(&self, leg: &Leg) -> Result<()> {
        let mut conn = self.pool.get()?;
        let ticker = Self::ticker_for_pair(&mut conn, &leg.pair_id)?;
        diesel::insert_into(orders::table)
            .values(Self::order_row(leg, &ticker))
            .execute(&mut conn)
            .map_err(map_diesel_err)?;
        Ok(())
    }

    fn update_pair_status(&self, pair_id: &PairId, status: PairStatus) -> Result<()> {
        let mut conn = self.pool.get()?;
        diesel::update(pairs::table.find(pair_id.to_string()))
            .set(pairs::status.eq(status.as_str()))
            .execute(&mut conn)
            .map_err(map_diesel_err)?;
        Ok(())
    }

    fn update_order_status(&self, order_id: &OrderId, status: LegStatus, filled_size: Option<Size>) -> Result<()> {
        let mut conn = self.pool.get()?;
        match filled_size {
            Some(size) => {
                diesel::update(orders::table.find(order_id.to_string()))
                    .set((orders::status.eq(status.as_str()), orders::filled_size.eq(size)))
                    .execute(&mut conn)
                    .map_err(map_diesel_err)?;
            }
            None => {
                diesel::update(orders::table.find(order_id.to_string()))
                    .set(orders::status.eq(status.as_str()))
                    .execute(&mut conn)
                    .map_err(map_diesel_err)?;
            }
        }
        Ok(())
    }

    fn append_pnl(&self, record: &PnlRecord) -> Result<()> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(pnl_log::table)
            .values(NewPnlRow {
                pair_id: record.pair_id.to_string(),
                ticker: record.ticker.clone(),
                yes_fill_price: record.yes_fill_price,
                no_fill_price: record.no_fill_price,
                size: record.size,
                combined_cost: record.combined_cost.to_string(),
                gross_profit: record.gross_profit.to_string(),
                fees: record.fees.to_string(),
                realized_pnl: record.realized_pnl.to_string(),
                timestamp: record.timestamp.to_rfc3339(),
            })
            .execute(&mut conn)
            .map_err(map_diesel_err)?;
        Ok(())
    }

    fn append_event(&self, event_type: &str, details: Value, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(events::table)
            .values(NewEventRow {
                event_type: event_type.to_string(),
                details_json: details.to_string(),
                timestamp: at.to_rfc3339(),
            })
            .execute(&mut conn)
            .map_err(map_diesel_err)?;
        Ok(())
    }

    fn open_pairs(&self) -> Result<Vec<Pair>> {
        let mut conn = self.pool.get()?;
        let rows: Vec<PairRow> = pairs::table
            .filter(pairs::status.eq(PairStatus::Open.as_str()))
            .load(&mut conn)
            .map_err(map_diesel_err)?;
        rows.into_iter().map(Self::pair_from_row).collect()
    }

    fn orders_for_pair(&self, pair_id: &PairId) -> Result<Vec<Leg>> {
        let mut conn = self.pool.get()?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::pair_id.eq(pair_id.to_string()))
            .load(&mut conn)
            .map_err(map_diesel_err)?;
        rows.into_iter().map(Self::leg_from_row).collect()
    }

    fn open_orders(&self) -> Result<Vec<Leg>> {
        let mut conn = self.pool.get()?;
        let rows: Vec<OrderRow> = orders::table
            .filter(orders::status.eq(LegStatus::Open.as_str()))
            .load(&mut conn)
            .map_err(map_diesel_err)?;
        rows.into_iter().map(Self::leg_from_row).collect()
    }

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Leg>> {
        let mut conn = self.pool.get()?;
        let row: Option<OrderRow> = orders::table
            .find(order_id.to_string())
            .first(&mut conn)
            .optional()
            .map_err(map_diesel_err)?;
        row.map(Self::leg_from_row).transpose()
    }

    fn pnl_summary(&self) -> Result<PnlSummary> {
        let mut conn = self.pool.get()?;
        let rows: Vec<PnlRow> = pnl_log::table.load(&mut conn).map_err(map_diesel_err)?;
        let records: Vec<PnlRecord> = rows.into_iter().map(Self::pnl_from_row).collect::<Result<_>>()?;

        let count = records.len() as i64;
        let total_realized = records.iter().map(|r| r.realized_pnl).sum();
        let total_fees = records.iter().map(|r| r.fees).sum();
        let average_realized = if count > 0 {
            total_realized / rust_decimal::Decimal::from(count)
        } else {
            rust_decimal::Decimal::ZERO
        };
        Ok(PnlSummary {
            count,
            total_realized,
            total_fees,
            average_realized,
        })
    }

    fn recent_pairs(&self, limit: i64) -> Result<Vec<Pair>> {
        let mut conn = self.pool.get()?;
        let rows: Vec<PairRow> = pairs::table
            .order(pairs::created_at.desc())
            .limit(limit)
            .load(&mut conn)
            .map_err(map_diesel_err)?;
        rows.into_iter().map(Self::pair_from_row).collect()
    }

    fn recent_pnl(&self, limit: i64) -> Result<Vec<PnlRecord>> {
        let mut conn = self.pool.get()?;
        let rows: Vec<PnlRow> = pnl_log::table
            .order(pnl_log::timestamp.desc())
            .limit(limit)
            .load(&mut conn)
            .map_err(map_diesel_err)?;
        rows.into_iter().map(Self::pnl_from_row).collect()
    }

    fn recent_events(&self, limit: i64) -> Result<Vec<(String, Value, DateTime<Utc>)>> {
        let mut conn = self.pool.get()?;
        let rows: Vec<EventRow> = events::table
            .order(events::timestamp.desc())
            .limit(limit)
            .load(&mut conn)
            .map_err(map_diesel_err)?;
        rows.into_iter()
            .map(|row| -> Result<(String, Value, DateTime<Utc>)> {
                let details: Value = serde_json::from_str(&row.details_json)?;
                Ok((row.event_type, details, parse_timestamp(&row.timestamp)?))
            })
            .collect()
    }

    fn count_by_status(&self, status: PairStatus) -> Result<i64> {
        let mut conn = self.pool.get()?;
        pairs::table
            .filter(pairs::status.eq(status.as_str()))
            .count()
            .get_result(&mut conn)
            .map_err(map_diesel_err)
    }
}
