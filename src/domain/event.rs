//! Append-only audit/event log.

use chrono::{DateTime, Utc};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_type: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    #[must_use]
    pub fn new(event_type: impl Into<String>, details: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            details,
            timestamp,
        }
    }
}

/// Well-known event kinds emitted by the position manager and engine.
pub mod kind {
    pub const PAIR_COMPLETE: &str = "pair_complete";
    pub const ONE_SIDED_FILL: &str = "one_sided_fill";
    pub const TRADING_HALTED: &str = "trading_halted";
    pub const RESOLUTION_DEADLINE: &str = "resolution_deadline_cancel";
    pub const RECOVERY_CANCEL: &str = "recovery_cancel";
    pub const RECOVERY_PARTIAL: &str = "recovery_partial";
    pub const BROKEN_INVARIANT: &str = "broken_invariant";
}
