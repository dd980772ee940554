//! Bar history that strategies and the portfolio query.
//!
//! A [`BarStore`] only exposes bars revealed by [`BarStore::advance`]. Nothing
//! returned by the `get_latest_*` family is ever newer than the last advance.

use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::error::ReplayError;
use super::event::Event;
use super::event_queue::EventSender;
use super::ohlcv::{Bar, BarField};
use crate::ports::data_port::DataPort;

pub trait BarStore {
    /// Symbols registered at construction, in configuration order.
    fn symbols(&self) -> &[String];

    /// Most recent revealed bar, `None` when nothing has been revealed yet.
    fn get_latest_bar(&self, symbol: &str) -> Result<Option<&Bar>, ReplayError>;

    /// Up to `n` most recent bars, oldest first. Returns fewer than `n` when
    /// less history exists; the slice length is the count actually available.
    fn get_latest_bars(&self, symbol: &str, n: usize) -> Result<&[Bar], ReplayError>;

    /// Reveal the next time step for every symbol and enqueue a market event.
    /// Returns `false`, without enqueuing anything, once the source is exhausted.
    fn advance(&mut self) -> bool;

    fn get_latest_bar_datetime(&self, symbol: &str) -> Result<Option<NaiveDateTime>, ReplayError> {
        Ok(self.get_latest_bar(symbol)?.map(|bar| bar.timestamp))
    }

    fn get_latest_bar_value(&self, symbol: &str, field: BarField) -> Result<Option<f64>, ReplayError> {
        Ok(self.get_latest_bar(symbol)?.map(|bar| bar.value(field)))
    }

    fn get_latest_bars_values(
        &self,
        symbol: &str,
        field: BarField,
        n: usize,
    ) -> Result<Vec<f64>, ReplayError> {
        Ok(self
            .get_latest_bars(symbol, n)?
            .iter()
            .map(|bar| bar.value(field))
            .collect())
    }
}

/// Replays pre-loaded bars one time step at a time.
///
/// All symbols share the union of their timestamps. A symbol with no bar at a
/// step gets its previous bar carried forward; before its first bar it simply
/// has no history.
#[derive(Debug)]
pub struct HistoricBarStore {
    symbols: Vec<String>,
    timeline: Vec<NaiveDateTime>,
    source: HashMap<String, Vec<Bar>>,
    next_index: HashMap<String, usize>,
    revealed: HashMap<String, Vec<Bar>>,
    cursor: usize,
    events: EventSender,
}

impl HistoricBarStore {
    pub fn new(
        events: EventSender,
        symbols: &[String],
        mut bars: HashMap<String, Vec<Bar>>,
    ) -> Result<Self, ReplayError> {
        let mut source = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let mut series = bars.remove(symbol).unwrap_or_default();
            if series.is_empty() {
                return Err(ReplayError::NoData {
                    symbol: symbol.clone(),
                });
            }
            series.sort_by_key(|b| b.timestamp);
            series.dedup_by_key(|b| b.timestamp);
            source.insert(symbol.clone(), series);
        }

        let timeline = build_unified_timeline(source.values());
        debug!(
            symbols = symbols.len(),
            steps = timeline.len(),
            "built bar store timeline"
        );

        Ok(HistoricBarStore {
            symbols: symbols.to_vec(),
            timeline,
            next_index: symbols.iter().map(|s| (s.clone(), 0)).collect(),
            revealed: symbols.iter().map(|s| (s.clone(), Vec::new())).collect(),
            source,
            cursor: 0,
            events,
        })
    }

    /// Load every symbol through a [`DataPort`].
    pub fn from_port(
        events: EventSender,
        symbols: &[String],
        port: &dyn DataPort,
    ) -> Result<Self, ReplayError> {
        let mut bars = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            bars.insert(symbol.clone(), port.fetch_bars(symbol)?);
        }
        Self::new(events, symbols, bars)
    }

    /// Whether another [`BarStore::advance`] would reveal a step.
    pub fn has_more(&self) -> bool {
        self.cursor < self.timeline.len()
    }

    fn history(&self, symbol: &str) -> Result<&Vec<Bar>, ReplayError> {
        self.revealed
            .get(symbol)
            .ok_or_else(|| ReplayError::unknown_symbol(symbol))
    }
}

impl BarStore for HistoricBarStore {
    fn symbols(&self) -> &[String] {
        &self.symbols
    }

    fn get_latest_bar(&self, symbol: &str) -> Result<Option<&Bar>, ReplayError> {
        Ok(self.history(symbol)?.last())
    }

    fn get_latest_bars(&self, symbol: &str, n: usize) -> Result<&[Bar], ReplayError> {
        let history = self.history(symbol)?;
        let start = history.len().saturating_sub(n);
        Ok(&history[start..])
    }

    fn advance(&mut self) -> bool {
        let Some(&timestamp) = self.timeline.get(self.cursor) else {
            return false;
        };

        for symbol in &self.symbols {
            let (Some(series), Some(next), Some(history)) = (
                self.source.get(symbol),
                self.next_index.get_mut(symbol),
                self.revealed.get_mut(symbol),
            ) else {
                continue;
            };

            match series.get(*next) {
                Some(bar) if bar.timestamp == timestamp => {
                    history.push(bar.clone());
                    *next += 1;
                }
                _ => {
                    if let Some(padded) = history.last().map(|last| last.carried_to(timestamp)) {
                        history.push(padded);
                    }
                }
            }
        }

        self.cursor += 1;
        self.events.send(Event::Market);
        true
    }
}

pub fn build_unified_timeline<'a>(
    series: impl IntoIterator<Item = &'a Vec<Bar>>,
) -> Vec<NaiveDateTime> {
    let unique: BTreeSet<NaiveDateTime> = series
        .into_iter()
        .flat_map(|bars| bars.iter().map(|bar| bar.timestamp))
        .collect();
    unique.into_iter().collect()
}
