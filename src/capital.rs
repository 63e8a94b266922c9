//! In-memory available/deployed balances (§4.2). Reconstructed from the
//! Ledger's OPEN pairs on startup, never itself persisted.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::{Dollars, PairId};
use crate::error::{Error, Result};

pub struct CapitalBook {
    available: Dollars,
    deployed: HashMap<PairId, Dollars>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapitalSummary {
    pub available: Dollars,
    pub deployed: Dollars,
    pub open_pairs: usize,
}

impl CapitalBook {
    #[must_use]
    pub fn new(starting_balance: Dollars) -> Self {
        Self {
            available: starting_balance,
            deployed: HashMap::new(),
        }
    }

    #[must_use]
    pub fn can_allocate(&self, amount: Dollars) -> bool {
        amount <= self.available
    }

    /// Decrements `available`, records the per-pair deployment. Fails with
    /// `DUPLICATE` if `pair_id` already has an allocation outstanding.
    pub fn allocate(&mut self, pair_id: PairId, amount: Dollars) -> Result<()> {
        if self.deployed.contains_key(&pair_id) {
            return Err(Error::Duplicate {
                kind: "allocation",
                id: pair_id.to_string(),
            });
        }
        self.available -= amount;
        self.deployed.insert(pair_id, amount);
        Ok(())
    }

    /// Returns `deployed[pair_id] + pnl` to `available` and clears the
    /// entry. `pnl` may be negative (one-sided loss). A release for an
    /// unknown `pair_id` is a no-op save for a warning — recovery paths may
    /// call this for pairs the book never saw an `allocate` for in this
    /// process lifetime only if the caller passes the reconstructed amount
    /// directly via `allocate` first.
    pub fn release(&mut self, pair_id: PairId, pnl: Dollars) {
        match self.deployed.remove(&pair_id) {
            Some(deployed) => {
                self.available += deployed + pnl;
            }
            None => {
                warn!(pair_id = %pair_id, "release called for a pair with no outstanding allocation");
            }
        }
    }

    #[must_use]
    pub fn summary(&self) -> CapitalSummary {
        CapitalSummary {
            available: self.available.round_dp(2),
            deployed: self.deployed.values().sum::<Decimal>().round_dp(2),
            open_pairs: self.deployed.len(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn deployed_for(&self, pair_id: PairId) -> Option<Dollars> {
        self.deployed.get(&pair_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn pid() -> PairId {
        PairId::new(Uuid::new_v4())
    }

    #[test]
    fn allocate_then_release_restores_available_plus_pnl() {
        let mut book = CapitalBook::new(dec!(1000));
        let id = pid();
        assert!(book.can_allocate(dec!(97)));
        book.allocate(id, dec!(97)).unwrap();
        assert_eq!(book.summary().available, dec!(903));

        book.release(id, dec!(0.21));
        assert_eq!(book.summary().available, dec!(1000.21));
        assert_eq!(book.summary().deployed, dec!(0));
    }

    #[test]
    fn double_allocate_same_pair_is_a_duplicate_error() {
        let mut book = CapitalBook::new(dec!(1000));
        let id = pid();
        book.allocate(id, dec!(50)).unwrap();
        let err = book.allocate(id, dec!(50)).unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn negative_pnl_release_books_a_loss() {
        let mut book = CapitalBook::new(dec!(1000));
        let id = pid();
        book.allocate(id, dec!(48)).unwrap();
        // One-sided loss: the whole deployed exposure is forfeit.
        book.release(id, -dec!(48));
        assert_eq!(book.summary().available, dec!(952));
    }

    #[test]
    fn invariant_holds_across_a_sequence_of_allocations_and_releases() {
        let starting = dec!(1000);
        let mut book = CapitalBook::new(starting);
        let mut realized = Decimal::ZERO;

        let ops: [(Decimal, Decimal); 3] = [(dec!(100), dec!(5)), (dec!(50), dec!(-50)), (dec!(80), dec!(1.2))];
        for (amount, pnl) in ops {
            let id = pid();
            book.allocate(id, amount).unwrap();
            book.release(id, pnl);
            realized += pnl;
        }

        let summary = book.summary();
        assert_eq!(summary.available + summary.deployed, starting + realized);
    }
}
