//! Goes long every symbol on its first available bar and never exits.

use std::collections::HashMap;

use super::{MarketPosition, Strategy, DEFAULT_STRATEGY_ID};
use crate::domain::bar_store::BarStore;
use crate::domain::error::ReplayError;
use crate::domain::event::{SignalDirection, SignalEvent};

#[derive(Debug, Clone)]
pub struct BuyAndHold {
    symbols: Vec<String>,
    bought: HashMap<String, MarketPosition>,
}

impl BuyAndHold {
    pub fn new(symbols: &[String]) -> Self {
        BuyAndHold {
            symbols: symbols.to_vec(),
            bought: symbols
                .iter()
                .map(|s| (s.clone(), MarketPosition::Out))
                .collect(),
        }
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_market_event(&mut self, bars: &dyn BarStore) -> Result<Vec<SignalEvent>, ReplayError> {
        let mut signals = Vec::new();
        for symbol in &self.symbols {
            let Some(bar) = bars.get_latest_bar(symbol)? else {
                continue;
            };
            let state = self.bought.entry(symbol.clone()).or_default();
            if *state == MarketPosition::Out {
                signals.push(SignalEvent::new(
                    DEFAULT_STRATEGY_ID,
                    symbol.clone(),
                    bar.timestamp,
                    SignalDirection::Long,
                    1.0,
                ));
                *state = MarketPosition::Long;
            }
        }
        Ok(signals)
    }
}
