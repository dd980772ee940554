//! Strategy contract and the concrete strategies.
//!
//! A strategy reacts to each market event by reading the bar store and
//! returning zero or more signals. Signal emission is edge-triggered: each
//! strategy keeps a per-symbol [`MarketPosition`] and only emits when that
//! flag changes, never on every bar a condition keeps holding.

pub mod buy_and_hold;
pub mod ma_cross;
pub mod pairs_ols;

use std::fmt;

use super::bar_store::BarStore;
use super::error::ReplayError;
use super::event::SignalEvent;
use super::ohlcv::BarField;

pub use buy_and_hold::BuyAndHold;
pub use ma_cross::MovingAverageCross;
pub use pairs_ols::PairsOls;

/// Identifier stamped on signals by the built-in strategies.
pub const DEFAULT_STRATEGY_ID: u32 = 1;

pub trait Strategy {
    fn name(&self) -> &str;

    /// React to the market event for the step most recently revealed by `bars`.
    fn on_market_event(&mut self, bars: &dyn BarStore) -> Result<Vec<SignalEvent>, ReplayError>;
}

/// The strategy's own view of whether it is in the market for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketPosition {
    #[default]
    Out,
    Long,
    Short,
}

/// Strategy selection and parameters, chosen at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    BuyAndHold,
    MovingAverageCross {
        short_window: usize,
        long_window: usize,
        price_field: BarField,
    },
    PairsOls {
        ols_window: usize,
        zscore_low: f64,
        zscore_high: f64,
        pair: (String, String),
    },
}

impl StrategyConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::BuyAndHold => "buy_and_hold",
            StrategyConfig::MovingAverageCross { .. } => "ma_cross",
            StrategyConfig::PairsOls { .. } => "pairs_ols",
        }
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyConfig::BuyAndHold => write!(f, "BuyAndHold"),
            StrategyConfig::MovingAverageCross {
                short_window,
                long_window,
                price_field,
            } => write!(
                f,
                "MovingAverageCross({}, {}, {})",
                short_window, long_window, price_field
            ),
            StrategyConfig::PairsOls {
                ols_window,
                zscore_low,
                zscore_high,
                pair,
            } => write!(
                f,
                "PairsOls({}/{}, window {}, z {}..{})",
                pair.0, pair.1, ols_window, zscore_low, zscore_high
            ),
        }
    }
}

pub fn build_strategy(config: &StrategyConfig, symbols: &[String]) -> Box<dyn Strategy> {
    match config {
        StrategyConfig::BuyAndHold => Box::new(BuyAndHold::new(symbols)),
        StrategyConfig::MovingAverageCross {
            short_window,
            long_window,
            price_field,
        } => Box::new(MovingAverageCross::new(
            symbols,
            *short_window,
            *long_window,
            *price_field,
        )),
        StrategyConfig::PairsOls {
            ols_window,
            zscore_low,
            zscore_high,
            pair,
        } => Box::new(PairsOls::new(
            pair.clone(),
            *ols_window,
            *zscore_low,
            *zscore_high,
        )),
    }
}
