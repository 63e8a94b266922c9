//! Injectable randomness. Pair-id generation and paper-fill simulation both
//! need a PRNG; both go through traits so tests can pin exact sequences
//! instead of reasoning about `rand::thread_rng()`.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use uuid::Uuid;

use crate::domain::{OrderId, PairId};

/// Source of fresh, globally-unique ids.
pub trait IdSource: Send {
    fn next_pair_id(&mut self) -> PairId;
    fn next_order_id(&mut self) -> OrderId;
}

/// Uniform `[0, 1)` draws for the paper-fill simulation of §4.7.1.
pub trait FillSampler: Send {
    fn sample(&mut self) -> f64;
}

/// Production RNG: seeded from the OS on construction, backs both traits off
/// a single `StdRng` so the whole engine uses one entropy source.
pub struct SystemRng(StdRng);

impl SystemRng {
    #[must_use]
    pub fn new() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl Default for SystemRng {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SystemRng {
    fn next_pair_id(&mut self) -> PairId {
        PairId::new(Uuid::from_bytes(self.0.gen()))
    }

    fn next_order_id(&mut self) -> OrderId {
        OrderId::new(Uuid::from_bytes(self.0.gen()))
    }
}

impl FillSampler for SystemRng {
    fn sample(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}

/// Deterministic RNG for tests: pinned seed, or a scripted sequence of draws.
#[cfg(any(test, feature = "testkit"))]
pub struct ScriptedRng {
    draws: std::collections::VecDeque<f64>,
    ids: std::collections::VecDeque<Uuid>,
    fallback_seed: StdRng,
}

#[cfg(any(test, feature = "testkit"))]
impl ScriptedRng {
    #[must_use]
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            ids: std::collections::VecDeque::new(),
            fallback_seed: StdRng::seed_from_u64(42),
        }
    }

    #[must_use]
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }
}

#[cfg(any(test, feature = "testkit"))]
impl IdSource for ScriptedRng {
    fn next_pair_id(&mut self) -> PairId {
        let uuid = self
            .ids
            .pop_front()
            .unwrap_or_else(|| Uuid::from_bytes(self.fallback_seed.gen()));
        PairId::new(uuid)
    }

    fn next_order_id(&mut self) -> OrderId {
        let uuid = self
            .ids
            .pop_front()
            .unwrap_or_else(|| Uuid::from_bytes(self.fallback_seed.gen()));
        OrderId::new(uuid)
    }
}

#[cfg(any(test, feature = "testkit"))]
impl FillSampler for ScriptedRng {
    fn sample(&mut self) -> f64 {
        self.draws.pop_front().unwrap_or(1.0)
    }
}
