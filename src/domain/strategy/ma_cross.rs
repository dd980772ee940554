//! Moving average crossover between a short and a long simple moving average.
//!
//! LONG when the short mean rises above the long mean while out of the market,
//! EXIT when it falls back below while long. No signal is produced until a
//! full long window of history is available.

use std::collections::HashMap;
use tracing::debug;

use super::{MarketPosition, Strategy, DEFAULT_STRATEGY_ID};
use crate::domain::bar_store::BarStore;
use crate::domain::error::ReplayError;
use crate::domain::event::{SignalDirection, SignalEvent};
use crate::domain::ohlcv::BarField;
use crate::domain::stats::mean;

#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    symbols: Vec<String>,
    short_window: usize,
    long_window: usize,
    price_field: BarField,
    bought: HashMap<String, MarketPosition>,
}

impl MovingAverageCross {
    pub fn new(
        symbols: &[String],
        short_window: usize,
        long_window: usize,
        price_field: BarField,
    ) -> Self {
        let long_window = long_window.max(1);
        MovingAverageCross {
            symbols: symbols.to_vec(),
            short_window: short_window.clamp(1, long_window),
            long_window,
            price_field,
            bought: symbols
                .iter()
                .map(|s| (s.clone(), MarketPosition::Out))
                .collect(),
        }
    }

    pub fn position(&self, symbol: &str) -> MarketPosition {
        self.bought.get(symbol).copied().unwrap_or_default()
    }
}

impl Strategy for MovingAverageCross {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn on_market_event(&mut self, bars: &dyn BarStore) -> Result<Vec<SignalEvent>, ReplayError> {
        let mut signals = Vec::new();
        for symbol in &self.symbols {
            let values = bars.get_latest_bars_values(symbol, self.price_field, self.long_window)?;
            if values.len() < self.long_window {
                continue;
            }
            let Some(timestamp) = bars.get_latest_bar_datetime(symbol)? else {
                continue;
            };

            let (Some(short_sma), Some(long_sma)) = (
                mean(&values[values.len() - self.short_window..]),
                mean(&values),
            ) else {
                continue;
            };

            let state = self.bought.entry(symbol.clone()).or_default();
            let direction = match *state {
                MarketPosition::Out if short_sma > long_sma => {
                    *state = MarketPosition::Long;
                    SignalDirection::Long
                }
                MarketPosition::Long if short_sma < long_sma => {
                    *state = MarketPosition::Out;
                    SignalDirection::Exit
                }
                _ => continue,
            };

            debug!(%symbol, %direction, %timestamp, short_sma, long_sma, "crossover");
            signals.push(SignalEvent::new(
                DEFAULT_STRATEGY_ID,
                symbol.clone(),
                timestamp,
                direction,
                1.0,
            ));
        }
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar_store::HistoricBarStore;
    use crate::domain::event_queue::EventQueue;
    use crate::domain::ohlcv::Bar;
    use chrono::NaiveDate;

    fn store_from_closes(queue: &EventQueue, closes: &[f64]) -> HistoricBarStore {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "AAPL".into(),
                timestamp: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                adj_close: close,
                volume: 100,
            })
            .collect();
        let mut data = HashMap::new();
        data.insert("AAPL".to_string(), bars);
        HistoricBarStore::new(queue.sender(), &["AAPL".to_string()], data).unwrap()
    }

    fn run(closes: &[f64], short: usize, long: usize) -> Vec<(usize, SignalDirection)> {
        let queue = EventQueue::new();
        let mut store = store_from_closes(&queue, closes);
        let mut strategy = MovingAverageCross::new(&["AAPL".to_string()], short, long, BarField::Close);
        let mut out = Vec::new();
        let mut step = 0;
        while store.advance() {
            for signal in strategy.on_market_event(&store).unwrap() {
                out.push((step, signal.direction));
            }
            step += 1;
        }
        out
    }

    #[test]
    fn no_signal_before_long_window_fills() {
        let signals = run(&[1.0, 2.0, 3.0], 2, 4);
        assert!(signals.is_empty());
    }

    #[test]
    fn one_long_then_one_exit_on_cross_and_back() {
        let closes = [
            10.0, 10.0, 10.0, 10.0, // flat warmup
            11.0, 12.0, 13.0, 14.0, 15.0, // rising: short above long
            12.0, 9.0, 7.0, 6.0, 5.0, // falling: short below long
        ];
        let signals = run(&closes, 2, 4);
        assert_eq!(
            signals,
            vec![(4, SignalDirection::Long), (10, SignalDirection::Exit)]
        );
    }

    #[test]
    fn persistent_uptrend_emits_single_long() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        let signals = run(&closes, 3, 10);
        assert_eq!(signals, vec![(9, SignalDirection::Long)]);
    }

    #[test]
    fn downtrend_while_out_emits_nothing() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert!(run(&closes, 3, 10).is_empty());
    }

    #[test]
    fn windows_are_normalised() {
        let strategy = MovingAverageCross::new(&["AAPL".to_string()], 50, 10, BarField::Close);
        assert_eq!(strategy.short_window, 10);
        assert_eq!(strategy.long_window, 10);
        assert_eq!(strategy.position("AAPL"), MarketPosition::Out);
    }
}
