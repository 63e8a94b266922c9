//! Pairs and legs: the unit of trading intent and its durable row shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{OrderId, PairId};
use super::money::{Cents, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairStatus {
    Open,
    Filled,
    Partial,
    Cancelled,
}

impl PairStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Filled => "filled",
            Self::Partial => "partial",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for PairStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "filled" => Ok(Self::Filled),
            "partial" => Ok(Self::Partial),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown pair status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegStatus {
    Open,
    Filled,
    Cancelled,
}

impl LegStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Filled => "filled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for LegStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "filled" => Ok(Self::Filled),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown leg status: {other}")),
        }
    }
}

/// A single leg (order) of a pair. `filled_size = size` iff `status = Filled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub order_id: OrderId,
    pub pair_id: PairId,
    pub side: Side,
    pub price_cents: Cents,
    pub size: Size,
    pub status: LegStatus,
    pub filled_size: Size,
    pub exchange_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Leg {
    #[must_use]
    pub fn new(
        order_id: OrderId,
        pair_id: PairId,
        side: Side,
        price_cents: Cents,
        size: Size,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            pair_id,
            side,
            price_cents,
            size,
            status: LegStatus::Open,
            filled_size: 0,
            exchange_order_id: None,
            created_at,
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, LegStatus::Open)
    }

    #[must_use]
    pub const fn is_filled(&self) -> bool {
        matches!(self.status, LegStatus::Filled)
    }
}

/// Durable row shape for a pair (flat, as stored in the ledger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub pair_id: PairId,
    pub ticker: String,
    pub asset: String,
    pub target_spread: Cents,
    pub status: PairStatus,
    pub created_at: DateTime<Utc>,
    pub market_question: String,
}

/// In-memory reconstitution of a pair with both legs inline, as a single
/// tagged variant so illegal combinations (e.g. `Filled` with a cancelled
/// leg) are unrepresentable. Built from a `Pair` row plus its two `Leg` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairState {
    Open { pair: Pair, yes: Leg, no: Leg },
    Filled { pair: Pair, yes: Leg, no: Leg },
    Partial { pair: Pair, filled: Leg, cancelled: Leg },
    Cancelled { pair: Pair, yes: Leg, no: Leg },
}

impl PairState {
    /// Reconstitute from a pair row and its exactly-two leg rows. Returns
    /// `None` if the legs don't form a valid YES/NO pair — callers should
    /// treat that as `BROKEN_INVARIANT`.
    #[must_use]
    pub fn from_rows(pair: Pair, legs: [Leg; 2]) -> Option<Self> {
        let [a, b] = legs;
        let (yes, no) = match (a.side, b.side) {
            (Side::Yes, Side::No) => (a, b),
            (Side::No, Side::Yes) => (b, a),
            _ => return None,
        };
        if yes.size != no.size {
            return None;
        }
        Some(match pair.status {
            PairStatus::Open => Self::Open { pair, yes, no },
            PairStatus::Filled => Self::Filled { pair, yes, no },
            PairStatus::Cancelled => Self::Cancelled { pair, yes, no },
            PairStatus::Partial => {
                let (filled, cancelled) = if yes.is_filled() {
                    (yes, no)
                } else {
                    (no, yes)
                };
                Self::Partial {
                    pair,
                    filled,
                    cancelled,
                }
            }
        })
    }

    #[must_use]
    pub const fn pair(&self) -> &Pair {
        match self {
            Self::Open { pair, .. }
            | Self::Filled { pair, .. }
            | Self::Partial { pair, .. }
            | Self::Cancelled { pair, .. } => pair,
        }
    }

    #[must_use]
    pub fn ticker(&self) -> &str {
        &self.pair().ticker
    }
}
