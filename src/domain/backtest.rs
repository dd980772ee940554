//! Backtest driver and event loop.
//!
//! Each cycle advances the bar store by one step and drains the event queue
//! to empty before the next step is revealed, so a bar's whole
//! market → signal → order → fill chain resolves within its own cycle.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::bar_store::{BarStore, HistoricBarStore};
use super::error::ReplayError;
use super::event::Event;
use super::event_queue::EventQueue;
use super::execution::{CommissionModel, ExecutionHandler, SimulatedExecutionHandler, DEFAULT_VENUE};
use super::ohlcv::BarField;
use super::performance::{EquityCurve, Summary};
use super::portfolio::{NaivePortfolio, Portfolio};
use super::position::HoldingsSnapshot;
use super::sizing::SizingConfig;
use super::strategy::{build_strategy, Strategy, StrategyConfig};
use crate::ports::data_port::DataPort;

/// Run parameters, passed in explicitly at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbols: Vec<String>,
    pub initial_capital: f64,
    pub start: NaiveDateTime,
    /// Pause between cycles. Zero disables it.
    pub heartbeat: Duration,
    pub periods_per_year: f64,
    /// Bar column used for marking and simulated fills.
    pub price_field: BarField,
    pub sizing: SizingConfig,
    pub venue: String,
    pub commission: CommissionModel,
}

impl BacktestConfig {
    pub fn new(symbols: Vec<String>, initial_capital: f64, start: NaiveDateTime) -> Self {
        BacktestConfig {
            symbols,
            initial_capital,
            start,
            heartbeat: Duration::ZERO,
            periods_per_year: 252.0,
            price_field: BarField::Close,
            sizing: SizingConfig::default(),
            venue: DEFAULT_VENUE.to_string(),
            commission: CommissionModel::Ib,
        }
    }
}

/// Events handled during a run, by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounters {
    pub steps: usize,
    pub signals: usize,
    pub orders: usize,
    pub fills: usize,
}

/// Cloneable handle that stops a running [`Backtest`] once its current cycle
/// finishes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub counters: RunCounters,
    pub summary: Summary,
    pub equity_curve: EquityCurve,
    pub final_positions: BTreeMap<String, i64>,
    pub final_holdings: HoldingsSnapshot,
    /// Whether the run ended through a [`StopHandle`] rather than exhaustion.
    pub stopped: bool,
}

pub struct Backtest {
    config: BacktestConfig,
    queue: EventQueue,
    bars: Box<dyn BarStore>,
    strategy: Box<dyn Strategy>,
    portfolio: Box<dyn Portfolio>,
    execution: Box<dyn ExecutionHandler>,
    counters: RunCounters,
    stop: StopHandle,
}

impl Backtest {
    /// Assemble a driver from its parts. `bars` must enqueue onto `queue`.
    pub fn new(
        config: BacktestConfig,
        queue: EventQueue,
        bars: Box<dyn BarStore>,
        strategy: Box<dyn Strategy>,
        portfolio: Box<dyn Portfolio>,
        execution: Box<dyn ExecutionHandler>,
    ) -> Self {
        Backtest {
            config,
            queue,
            bars,
            strategy,
            portfolio,
            execution,
            counters: RunCounters::default(),
            stop: StopHandle::default(),
        }
    }

    /// Load every configured symbol from `port` and wire up the historic bar
    /// store, the configured strategy, a naive portfolio and simulated execution.
    pub fn from_port(
        config: BacktestConfig,
        strategy: &StrategyConfig,
        port: &dyn DataPort,
    ) -> Result<Self, ReplayError> {
        let queue = EventQueue::new();
        let bars = HistoricBarStore::from_port(queue.sender(), &config.symbols, port)?;
        let portfolio = NaivePortfolio::new(&config.symbols, config.initial_capital, config.start)
            .with_sizer(config.sizing.build())
            .with_price_field(config.price_field);
        let execution = SimulatedExecutionHandler::new(
            config.venue.clone(),
            config.price_field,
            config.commission,
        );
        let strategy = build_strategy(strategy, &config.symbols);

        Ok(Backtest::new(
            config,
            queue,
            Box::new(bars),
            strategy,
            Box::new(portfolio),
            Box::new(execution),
        ))
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    pub fn portfolio(&self) -> &dyn Portfolio {
        self.portfolio.as_ref()
    }

    pub fn bars(&self) -> &dyn BarStore {
        self.bars.as_ref()
    }

    /// Reveal one step and process every event it causes. Returns `false`
    /// once the bar store is exhausted.
    pub fn step(&mut self) -> Result<bool, ReplayError> {
        if !self.bars.advance() {
            return Ok(false);
        }
        self.counters.steps += 1;
        self.drain()?;
        Ok(true)
    }

    fn drain(&mut self) -> Result<(), ReplayError> {
        while let Some(event) = self.queue.try_next() {
            match event {
                Event::Market => {
                    for signal in self.strategy.on_market_event(self.bars.as_ref())? {
                        self.queue.push(Event::Signal(signal));
                    }
                    self.portfolio.on_market_event(self.bars.as_ref())?;
                }
                Event::Signal(signal) => {
                    self.counters.signals += 1;
                    if let Some(order) = self.portfolio.on_signal(&signal) {
                        self.queue.push(Event::Order(order));
                    }
                }
                Event::Order(order) => {
                    self.counters.orders += 1;
                    debug!(%order, "executing");
                    let fill = self.execution.execute(&order, self.bars.as_ref())?;
                    self.queue.push(Event::Fill(fill));
                }
                Event::Fill(fill) => {
                    self.counters.fills += 1;
                    self.portfolio.on_fill(&fill);
                }
            }
        }
        Ok(())
    }

    /// Run until the data is exhausted or the stop handle fires, then build
    /// the equity curve and summary.
    pub fn run(mut self) -> Result<BacktestResult, ReplayError> {
        info!(
            strategy = self.strategy.name(),
            symbols = ?self.config.symbols,
            initial_capital = self.config.initial_capital,
            "starting backtest"
        );

        let mut stopped = false;
        loop {
            if self.stop.is_stopped() {
                stopped = true;
                break;
            }
            if !self.step()? {
                break;
            }
            if !self.config.heartbeat.is_zero() {
                std::thread::sleep(self.config.heartbeat);
            }
        }

        let equity_curve = self.portfolio.equity_curve();
        let summary = Summary::from_curve(&equity_curve, self.config.periods_per_year);
        info!(
            steps = self.counters.steps,
            signals = self.counters.signals,
            orders = self.counters.orders,
            fills = self.counters.fills,
            total_return = summary.total_return,
            stopped,
            "backtest finished"
        );

        Ok(BacktestResult {
            strategy: self.strategy.name().to_string(),
            counters: self.counters,
            summary,
            equity_curve,
            final_positions: self.portfolio.current_positions().clone(),
            final_holdings: self.portfolio.current_holdings().clone(),
            stopped,
        })
    }
}
