//! Position state and the per-step snapshots the portfolio records.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Lifecycle state of a signed position. Transitions only pass through `Flat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl PositionState {
    pub fn from_quantity(quantity: i64) -> Self {
        match quantity {
            q if q > 0 => PositionState::Long,
            q if q < 0 => PositionState::Short,
            _ => PositionState::Flat,
        }
    }

    pub fn is_flat(self) -> bool {
        self == PositionState::Flat
    }
}

/// Signed quantity per symbol at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub timestamp: NaiveDateTime,
    pub positions: BTreeMap<String, i64>,
}

impl PositionSnapshot {
    pub fn quantity(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }
}

/// Cash, accumulated commission and market value per symbol at a point in time.
///
/// `total` is always `cash + Σ market_values`.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingsSnapshot {
    pub timestamp: NaiveDateTime,
    pub market_values: BTreeMap<String, f64>,
    pub cash: f64,
    pub commission: f64,
    pub total: f64,
}

impl HoldingsSnapshot {
    pub fn market_value(&self, symbol: &str) -> f64 {
        self.market_values.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn market_value_sum(&self) -> f64 {
        self.market_values.values().sum()
    }
}
