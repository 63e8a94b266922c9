//! Ports: traits the application core depends on, implemented by `infra` in
//! production and by in-memory stubs in tests.

pub mod exchange;
pub mod ledger;
pub mod rng;

pub use exchange::{CancelOutcome, ExchangeClient, ExchangeMarket, NewOrder, OrderSide};
pub use ledger::Ledger;
pub use rng::{FillSampler, IdSource, SystemRng};
