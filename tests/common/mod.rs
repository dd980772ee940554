#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
pub use replaytrader::domain::ohlcv::Bar;
use replaytrader::domain::backtest::BacktestConfig;
use replaytrader::domain::error::ReplayError;
use replaytrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub const HEADER: &str = "datetime,open,low,high,close,adj_close,volume\n";

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, ReplayError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ReplayError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, ReplayError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp: NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        adj_close: close,
        volume: 1000,
    }
}

/// One bar per day starting at `start_date`, with the given closes.
pub fn bars_from_closes(symbol: &str, start_date: &str, closes: &[f64]) -> Vec<Bar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let date = start + chrono::Duration::days(i as i64);
            make_bar(symbol, &date.format("%Y-%m-%d").to_string(), close)
        })
        .collect()
}

pub fn generate_bars(symbol: &str, start_date: &str, count: usize, start_price: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(symbol, start_date, &closes)
}

pub fn sample_config(symbols: &[&str]) -> BacktestConfig {
    BacktestConfig::new(
        symbols.iter().map(|s| s.to_string()).collect(),
        100_000.0,
        ts(2024, 1, 1),
    )
}

/// Render bars in the CSV layout the file adapter reads.
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from(HEADER);
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            b.timestamp.format("%Y-%m-%d"),
            b.open,
            b.low,
            b.high,
            b.close,
            b.adj_close,
            b.volume
        ));
    }
    out
}
