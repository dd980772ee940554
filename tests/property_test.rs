//! Property tests for portfolio invariants.
//!
//! Uses proptest to verify:
//! 1. Position legality: a position never flips sign without passing flat
//! 2. Accounting: cash and total reconcile with the fills after every event
//! 3. Drawdowns are non-negative and bounded by the high-water mark

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use replaytrader::domain::bar_store::{BarStore, HistoricBarStore};
use replaytrader::domain::event::{FillEvent, SignalDirection, SignalEvent};
use replaytrader::domain::event_queue::EventQueue;
use replaytrader::domain::execution::{ExecutionHandler, SimulatedExecutionHandler};
use replaytrader::domain::ohlcv::Bar;
use replaytrader::domain::performance::drawdowns;
use replaytrader::domain::portfolio::{NaivePortfolio, Portfolio};
use std::collections::HashMap;

const SYMBOLS: [&str; 2] = ["AAA", "BBB"];
const INITIAL: f64 = 100_000.0;

fn ts(step: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(step as i64)
}

fn arb_direction() -> impl Strategy<Value = SignalDirection> {
    prop_oneof![
        Just(SignalDirection::Long),
        Just(SignalDirection::Short),
        Just(SignalDirection::Exit),
    ]
}

/// One step: a price per symbol and an optional signal.
fn arb_step() -> impl Strategy<Value = Step> {
    (
        prop::array::uniform2(1.0..500.0_f64),
        prop::option::of((0..SYMBOLS.len(), arb_direction(), 0.0..3.0_f64)),
    )
}

fn symbols() -> Vec<String> {
    SYMBOLS.iter().map(|s| s.to_string()).collect()
}

type Step = ([f64; 2], Option<(usize, SignalDirection, f64)>);

fn store_for(queue: &EventQueue, steps: &[Step]) -> HistoricBarStore {
    let mut data: HashMap<String, Vec<Bar>> = HashMap::new();
    for (i, symbol) in SYMBOLS.iter().enumerate() {
        let bars = steps
            .iter()
            .enumerate()
            .map(|(step, (prices, _))| Bar {
                symbol: symbol.to_string(),
                timestamp: ts(step),
                open: prices[i],
                high: prices[i],
                low: prices[i],
                close: prices[i],
                adj_close: prices[i],
                volume: 1000,
            })
            .collect();
        data.insert(symbol.to_string(), bars);
    }
    HistoricBarStore::new(queue.sender(), &symbols(), data).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn positions_never_flip_without_going_flat(steps in prop::collection::vec(arb_step(), 1..60)) {
        let queue = EventQueue::new();
        let mut store = store_for(&queue, &steps);
        let mut portfolio = NaivePortfolio::new(&symbols(), INITIAL, ts(0));
        let mut execution = SimulatedExecutionHandler::default();

        for (step, (_, signal)) in steps.iter().enumerate() {
            prop_assert!(store.advance());
            portfolio.on_market_event(&store).unwrap();

            let Some((idx, direction, strength)) = *signal else { continue };
            let symbol = SYMBOLS[idx];
            let before = portfolio.position(symbol);
            let signal = SignalEvent::new(1, symbol, ts(step), direction, strength);
            if let Some(order) = portfolio.on_signal(&signal) {
                let fill = execution.execute(&order, &store).unwrap();
                portfolio.on_fill(&fill);
            }
            let after = portfolio.position(symbol);

            prop_assert!(before.signum() * after.signum() >= 0, "{} -> {}", before, after);
            match direction {
                SignalDirection::Exit => prop_assert_eq!(after, 0),
                _ if before != 0 => prop_assert_eq!(after, before),
                _ => {}
            }
        }
    }

    #[test]
    fn cash_and_total_reconcile_with_fills(steps in prop::collection::vec(arb_step(), 1..60)) {
        let queue = EventQueue::new();
        let mut store = store_for(&queue, &steps);
        let mut portfolio = NaivePortfolio::new(&symbols(), INITIAL, ts(0));
        let mut execution = SimulatedExecutionHandler::default();
        let mut fills: Vec<FillEvent> = Vec::new();

        for (step, (prices, signal)) in steps.iter().enumerate() {
            prop_assert!(store.advance());
            portfolio.on_market_event(&store).unwrap();

            let holdings = portfolio.current_holdings();
            for (i, symbol) in SYMBOLS.iter().enumerate() {
                let expected = portfolio.position(symbol) as f64 * prices[i];
                prop_assert!((holdings.market_value(symbol) - expected).abs() < 1e-6);
            }

            if let Some((idx, direction, strength)) = *signal {
                let signal = SignalEvent::new(1, SYMBOLS[idx], ts(step), direction, strength);
                if let Some(order) = portfolio.on_signal(&signal) {
                    let fill = execution.execute(&order, &store).unwrap();
                    portfolio.on_fill(&fill);
                    fills.push(fill);
                }
            }

            let holdings = portfolio.current_holdings();
            let flows: f64 = fills.iter().map(FillEvent::cash_flow).sum();
            let commission: f64 = fills.iter().map(|f| f.commission).sum();
            prop_assert!((holdings.cash - (INITIAL + flows)).abs() < 1e-6);
            prop_assert!((holdings.total - (holdings.cash + holdings.market_value_sum())).abs() < 1e-6);
            prop_assert!((holdings.commission - commission).abs() < 1e-9);
        }

        prop_assert_eq!(portfolio.all_holdings().len(), steps.len() + 1);
    }

    #[test]
    fn drawdowns_are_bounded(equity in prop::collection::vec(0.01f64..10.0, 1..200)) {
        let (series, max_dd, duration) = drawdowns(&equity);
        prop_assert_eq!(series.len(), equity.len());
        prop_assert!(series.iter().all(|d| *d >= 0.0));
        prop_assert!(duration < equity.len());

        let peak = equity.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(max_dd <= peak);
        let largest = series.iter().cloned().fold(0.0, f64::max);
        prop_assert_eq!(max_dd, largest);
    }
}
