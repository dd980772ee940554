//! Pairs mean reversion on a rolling OLS hedge ratio.
//!
//! Each bar regresses the closes of `y` on `x` over the last `ols_window` bars
//! (no intercept), builds the spread `y - beta * x` and takes the z-score of its
//! latest value. The pair is entered when the z-score crosses the high
//! threshold and flattened once it returns inside the low threshold. Signals
//! always come in pairs, one per leg; the `x` leg is sized by `|beta|`.

use tracing::debug;

use super::{MarketPosition, Strategy, DEFAULT_STRATEGY_ID};
use crate::domain::bar_store::BarStore;
use crate::domain::error::ReplayError;
use crate::domain::event::{SignalDirection, SignalEvent};
use crate::domain::ohlcv::BarField;
use crate::domain::stats::{ols_slope_through_origin, zscore_last};

#[derive(Debug, Clone)]
pub struct PairsOls {
    pair: (String, String),
    ols_window: usize,
    zscore_low: f64,
    zscore_high: f64,
    position: MarketPosition,
    hedge_ratio: Option<f64>,
}

impl PairsOls {
    pub fn new(pair: (String, String), ols_window: usize, zscore_low: f64, zscore_high: f64) -> Self {
        PairsOls {
            pair,
            ols_window: ols_window.max(2),
            zscore_low,
            zscore_high,
            position: MarketPosition::Out,
            hedge_ratio: None,
        }
    }

    /// Position of the spread: `Long` means long `y` / short `x`.
    pub fn position(&self) -> MarketPosition {
        self.position
    }

    /// Hedge ratio from the most recent full window.
    pub fn hedge_ratio(&self) -> Option<f64> {
        self.hedge_ratio
    }

    /// Directions for the (`y`, `x`) legs given the latest z-score, advancing
    /// the spread position when a transition fires.
    fn transition(&mut self, zscore: f64) -> Option<(SignalDirection, SignalDirection)> {
        match self.position {
            MarketPosition::Out if zscore <= -self.zscore_high => {
                self.position = MarketPosition::Long;
                Some((SignalDirection::Long, SignalDirection::Short))
            }
            MarketPosition::Out if zscore >= self.zscore_high => {
                self.position = MarketPosition::Short;
                Some((SignalDirection::Short, SignalDirection::Long))
            }
            MarketPosition::Long | MarketPosition::Short if zscore.abs() <= self.zscore_low => {
                self.position = MarketPosition::Out;
                Some((SignalDirection::Exit, SignalDirection::Exit))
            }
            _ => None,
        }
    }
}

impl Strategy for PairsOls {
    fn name(&self) -> &str {
        "pairs_ols"
    }

    fn on_market_event(&mut self, bars: &dyn BarStore) -> Result<Vec<SignalEvent>, ReplayError> {
        let (y_symbol, x_symbol) = (self.pair.0.clone(), self.pair.1.clone());
        let y = bars.get_latest_bars_values(&y_symbol, BarField::Close, self.ols_window)?;
        let x = bars.get_latest_bars_values(&x_symbol, BarField::Close, self.ols_window)?;
        if y.len() < self.ols_window || x.len() < self.ols_window {
            return Ok(Vec::new());
        }

        let Some(beta) = ols_slope_through_origin(&y, &x) else {
            return Ok(Vec::new());
        };
        self.hedge_ratio = Some(beta);

        let spread: Vec<f64> = y.iter().zip(&x).map(|(yv, xv)| yv - beta * xv).collect();
        let Some(zscore) = zscore_last(&spread) else {
            return Ok(Vec::new());
        };

        let Some((y_dir, x_dir)) = self.transition(zscore) else {
            return Ok(Vec::new());
        };
        let Some(timestamp) = bars.get_latest_bar_datetime(&y_symbol)? else {
            return Ok(Vec::new());
        };

        debug!(
            y = %y_symbol,
            x = %x_symbol,
            zscore,
            hedge_ratio = beta,
            "pair transition"
        );

        let x_strength = if x_dir == SignalDirection::Exit {
            1.0
        } else {
            beta.abs()
        };
        Ok(vec![
            SignalEvent::new(DEFAULT_STRATEGY_ID, y_symbol, timestamp, y_dir, 1.0),
            SignalEvent::new(DEFAULT_STRATEGY_ID, x_symbol, timestamp, x_dir, x_strength),
        ])
    }
}
