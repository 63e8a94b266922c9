//! Concrete adapters: the Kalshi-shaped exchange client, the SQLite ledger,
//! and process-start logging setup. Everything here implements a `port`
//! trait; the application core never names a type from this module.

pub mod db;
pub mod kalshi;
pub mod logging;
pub mod sqlite_ledger;
