//! Position and holdings accounting.
//!
//! The portfolio is the only writer of position and cash state. It marks
//! holdings to market on every market event, turns signals into orders via a
//! [`PositionSizer`], and applies fills. After every fill
//! `cash == initial_capital + Σ fill.cash_flow()` and
//! `total == cash + Σ market_value` hold.

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::bar_store::BarStore;
use super::error::ReplayError;
use super::event::{FillEvent, OrderDirection, OrderEvent, SignalDirection, SignalEvent};
use super::ohlcv::BarField;
use super::performance::{EquityCurve, Summary};
use super::position::{HoldingsSnapshot, PositionSnapshot, PositionState};
use super::sizing::{FixedUnitSizer, PositionSizer};

pub trait Portfolio {
    /// Append one position and one holdings snapshot marked at the latest bars.
    fn on_market_event(&mut self, bars: &dyn BarStore) -> Result<(), ReplayError>;

    /// Order implied by `signal`, or `None` when it is a no-op for the
    /// current position.
    fn on_signal(&mut self, signal: &SignalEvent) -> Option<OrderEvent>;

    fn on_fill(&mut self, fill: &FillEvent);

    fn initial_capital(&self) -> f64;
    fn current_positions(&self) -> &BTreeMap<String, i64>;
    fn current_holdings(&self) -> &HoldingsSnapshot;
    fn all_positions(&self) -> &[PositionSnapshot];
    fn all_holdings(&self) -> &[HoldingsSnapshot];

    fn position(&self, symbol: &str) -> i64 {
        self.current_positions().get(symbol).copied().unwrap_or(0)
    }

    fn equity_curve(&self) -> EquityCurve {
        EquityCurve::from_holdings(self.all_holdings())
    }

    fn summary(&self, periods_per_year: f64) -> Summary {
        Summary::from_curve(&self.equity_curve(), periods_per_year)
    }
}

/// Long/short portfolio with no risk management: sizes entries with its
/// sizer, only enters from flat, and exits the whole position.
pub struct NaivePortfolio {
    symbols: Vec<String>,
    initial_capital: f64,
    price_field: BarField,
    sizer: Box<dyn PositionSizer>,
    current_positions: BTreeMap<String, i64>,
    current_holdings: HoldingsSnapshot,
    all_positions: Vec<PositionSnapshot>,
    all_holdings: Vec<HoldingsSnapshot>,
    last_prices: HashMap<String, f64>,
}

impl NaivePortfolio {
    pub fn new(symbols: &[String], initial_capital: f64, start: NaiveDateTime) -> Self {
        let current_positions: BTreeMap<String, i64> =
            symbols.iter().map(|s| (s.clone(), 0)).collect();
        let current_holdings = HoldingsSnapshot {
            timestamp: start,
            market_values: symbols.iter().map(|s| (s.clone(), 0.0)).collect(),
            cash: initial_capital,
            commission: 0.0,
            total: initial_capital,
        };

        NaivePortfolio {
            symbols: symbols.to_vec(),
            initial_capital,
            price_field: BarField::Close,
            sizer: Box::new(FixedUnitSizer::default()),
            all_positions: vec![PositionSnapshot {
                timestamp: start,
                positions: current_positions.clone(),
            }],
            all_holdings: vec![current_holdings.clone()],
            current_positions,
            current_holdings,
            last_prices: HashMap::new(),
        }
    }

    pub fn with_sizer(mut self, sizer: Box<dyn PositionSizer>) -> Self {
        self.sizer = sizer;
        self
    }

    /// Bar column used to mark positions to market.
    pub fn with_price_field(mut self, price_field: BarField) -> Self {
        self.price_field = price_field;
        self
    }
}

impl Portfolio for NaivePortfolio {
    fn on_market_event(&mut self, bars: &dyn BarStore) -> Result<(), ReplayError> {
        let mut timestamp: Option<NaiveDateTime> = None;
        for symbol in &self.symbols {
            if let Some(bar) = bars.get_latest_bar(symbol)? {
                self.last_prices
                    .insert(symbol.clone(), bar.value(self.price_field));
                timestamp = timestamp.max(Some(bar.timestamp));
            }
        }
        let Some(timestamp) = timestamp else {
            return Ok(());
        };

        let mut market_values = BTreeMap::new();
        for symbol in &self.symbols {
            let quantity = self.current_positions.get(symbol).copied().unwrap_or(0);
            let price = self.last_prices.get(symbol).copied().unwrap_or(0.0);
            market_values.insert(symbol.clone(), quantity as f64 * price);
        }

        let holdings = &mut self.current_holdings;
        holdings.timestamp = timestamp;
        holdings.market_values = market_values;
        holdings.total = holdings.cash + holdings.market_value_sum();

        self.all_positions.push(PositionSnapshot {
            timestamp,
            positions: self.current_positions.clone(),
        });
        self.all_holdings.push(self.current_holdings.clone());
        Ok(())
    }

    fn on_signal(&mut self, signal: &SignalEvent) -> Option<OrderEvent> {
        let current = self.position(&signal.symbol);
        let state = PositionState::from_quantity(current);

        let (direction, quantity) = match (signal.direction, state) {
            (SignalDirection::Long, PositionState::Flat) => (
                OrderDirection::Buy,
                self.sizer.quantity(
                    signal,
                    self.current_holdings.cash,
                    self.last_prices.get(&signal.symbol).copied(),
                ),
            ),
            (SignalDirection::Short, PositionState::Flat) => (
                OrderDirection::Sell,
                self.sizer.quantity(
                    signal,
                    self.current_holdings.cash,
                    self.last_prices.get(&signal.symbol).copied(),
                ),
            ),
            (SignalDirection::Exit, PositionState::Long) => {
                (OrderDirection::Sell, current.unsigned_abs())
            }
            (SignalDirection::Exit, PositionState::Short) => {
                (OrderDirection::Buy, current.unsigned_abs())
            }
            (direction, state) => {
                debug!(
                    symbol = %signal.symbol,
                    %direction,
                    position = current,
                    ?state,
                    "dropping signal: invalid transition"
                );
                return None;
            }
        };

        if quantity == 0 {
            debug!(symbol = %signal.symbol, strength = signal.strength, "dropping signal: zero size");
            return None;
        }
        Some(OrderEvent::market(signal.symbol.clone(), quantity, direction))
    }

    fn on_fill(&mut self, fill: &FillEvent) {
        let sign = fill.direction.sign();
        let signed_quantity = sign * fill.quantity as i64;
        *self
            .current_positions
            .entry(fill.symbol.clone())
            .or_insert(0) += signed_quantity;

        let cost = sign as f64 * fill.fill_cost * fill.quantity as f64;
        let holdings = &mut self.current_holdings;
        *holdings
            .market_values
            .entry(fill.symbol.clone())
            .or_insert(0.0) += cost;
        holdings.commission += fill.commission;
        holdings.cash -= cost + fill.commission;
        holdings.total = holdings.cash + holdings.market_value_sum();

        debug!(
            symbol = %fill.symbol,
            direction = %fill.direction,
            quantity = fill.quantity,
            fill_cost = fill.fill_cost,
            commission = fill.commission,
            cash = holdings.cash,
            "fill applied"
        );
    }

    fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    fn current_positions(&self) -> &BTreeMap<String, i64> {
        &self.current_positions
    }

    fn current_holdings(&self) -> &HoldingsSnapshot {
        &self.current_holdings
    }

    fn all_positions(&self) -> &[PositionSnapshot] {
        &self.all_positions
    }

    fn all_holdings(&self) -> &[HoldingsSnapshot] {
        &self.all_holdings
    }
}
