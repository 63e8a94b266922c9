//! SQLite-backed `Ledger` round trips (§4.1, §8 invariant 3/4), against a
//! real temp-file database rather than `:memory:` so migrations and pool
//! behavior are exercised the same way `init-db`/`run` use them.

use chrono::Utc;
use pairkeeper::domain::{Leg, Pair, PairStatus, Side};
use pairkeeper::infra::db::{create_pool, run_migrations};
use pairkeeper::infra::sqlite_ledger::SqliteLedger;
use pairkeeper::port::Ledger;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn test_ledger() -> (SqliteLedger, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let pool = create_pool(db_path.to_str().unwrap()).unwrap();
    run_migrations(&pool).unwrap();
    (SqliteLedger::new(pool), dir)
}

fn seeded_pair(ledger: &SqliteLedger, ticker: &str) -> pairkeeper::domain::PairId {
    let pair_id = pairkeeper::domain::PairId::new(Uuid::new_v4());
    let now = Utc::now();
    ledger
        .insert_pair(&Pair {
            pair_id,
            ticker: ticker.into(),
            asset: "BTC".into(),
            target_spread: 3,
            status: PairStatus::Open,
            created_at: now,
            market_question: ticker.into(),
        })
        .unwrap();
    ledger
        .insert_order(&Leg::new(
            pairkeeper::domain::OrderId::new(Uuid::new_v4()),
            pair_id,
            Side::Yes,
            48,
            10,
            now,
        ))
        .unwrap();
    ledger
        .insert_order(&Leg::new(
            pairkeeper::domain::OrderId::new(Uuid::new_v4()),
            pair_id,
            Side::No,
            49,
            10,
            now,
        ))
        .unwrap();
    pair_id
}

#[test]
fn inserted_pair_round_trips_through_open_pairs() {
    let (ledger, _dir) = test_ledger();
    let pair_id = seeded_pair(&ledger, "KXBTC-1");

    let open = ledger.open_pairs().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].pair_id, pair_id);
    assert_eq!(open[0].ticker, "KXBTC-1");

    let legs = ledger.orders_for_pair(&pair_id).unwrap();
    assert_eq!(legs.len(), 2);
}

#[test]
fn duplicate_pair_insert_is_reported_as_duplicate() {
    let (ledger, _dir) = test_ledger();
    let pair_id = pairkeeper::domain::PairId::new(Uuid::new_v4());
    let now = Utc::now();
    let pair = Pair {
        pair_id,
        ticker: "KXBTC-1".into(),
        asset: "BTC".into(),
        target_spread: 3,
        status: PairStatus::Open,
        created_at: now,
        market_question: "KXBTC-1".into(),
    };
    ledger.insert_pair(&pair).unwrap();
    let err = ledger.insert_pair(&pair).unwrap_err();
    assert!(err.is_duplicate());
}

#[test]
fn update_pair_status_removes_it_from_open_pairs() {
    let (ledger, _dir) = test_ledger();
    let pair_id = seeded_pair(&ledger, "KXBTC-1");
    ledger.update_pair_status(&pair_id, PairStatus::Filled).unwrap();

    assert!(ledger.open_pairs().unwrap().is_empty());
    let recent = ledger.recent_pairs(10).unwrap();
    assert_eq!(recent[0].status, PairStatus::Filled);
}

#[test]
fn pnl_summary_aggregates_across_appended_records() {
    let (ledger, _dir) = test_ledger();
    let pair_id = seeded_pair(&ledger, "KXBTC-1");
    let now = Utc::now();

    ledger
        .append_pnl(&pairkeeper::domain::PnlRecord {
            pair_id,
            ticker: "KXBTC-1".into(),
            yes_fill_price: 48,
            no_fill_price: 49,
            size: 10,
            combined_cost: dec!(9.70),
            gross_profit: dec!(0.30),
            fees: dec!(0.10),
            realized_pnl: dec!(0.20),
            timestamp: now,
        })
        .unwrap();

    let summary = ledger.pnl_summary().unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.total_realized, dec!(0.20));
    assert_eq!(summary.average_realized, dec!(0.20));
}

#[test]
fn append_event_round_trips_json_details() {
    let (ledger, _dir) = test_ledger();
    let now = Utc::now();
    ledger
        .append_event("trading_halted", serde_json::json!({ "consecutive_one_sided": 3 }), now)
        .unwrap();

    let events = ledger.recent_events(10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "trading_halted");
    assert_eq!(events[0].1["consecutive_one_sided"], 3);
}

#[test]
fn count_by_status_reflects_updates() {
    let (ledger, _dir) = test_ledger();
    seeded_pair(&ledger, "KXBTC-1");
    let second = seeded_pair(&ledger, "KXBTC-2");
    ledger.update_pair_status(&second, PairStatus::Cancelled).unwrap();

    assert_eq!(ledger.count_by_status(PairStatus::Open).unwrap(), 1);
    assert_eq!(ledger.count_by_status(PairStatus::Cancelled).unwrap(), 1);
}
