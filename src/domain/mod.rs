//! Pure domain types: no I/O, no async, no config. Everything here is built
//! from plain data and total functions so it is trivially unit-testable.

pub mod book;
pub mod contract;
pub mod event;
pub mod fees;
pub mod ids;
pub mod money;
pub mod pair;
pub mod pnl;
pub mod signal;

pub use book::{Book, MarketBook, PriceLevel};
pub use contract::Contract;
pub use event::EventRecord;
pub use ids::{OrderId, PairId};
pub use money::{Cents, Dollars, Size};
pub use pair::{Leg, LegStatus, Pair, PairState, PairStatus, Side};
pub use pnl::{PnlRecord, PnlSummary};
pub use signal::PairSignal;
