//! OHLCV bar representation.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// One OHLCV (+ adjusted close) observation for a symbol. Never mutated after
/// the bar source produces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: i64,
}

/// Selects a single numeric column of a [`Bar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Bar {
    pub fn value(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::AdjClose => self.adj_close,
            BarField::Volume => self.volume as f64,
        }
    }

    /// Copy of this bar carried forward to a later timestamp (pad semantics).
    pub fn carried_to(&self, timestamp: NaiveDateTime) -> Bar {
        Bar {
            timestamp,
            ..self.clone()
        }
    }
}

impl fmt::Display for BarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarField::Open => "open",
            BarField::High => "high",
            BarField::Low => "low",
            BarField::Close => "close",
            BarField::AdjClose => "adj_close",
            BarField::Volume => "volume",
        };
        f.write_str(name)
    }
}

impl FromStr for BarField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(BarField::Open),
            "high" => Ok(BarField::High),
            "low" => Ok(BarField::Low),
            "close" => Ok(BarField::Close),
            "adj_close" | "adjclose" | "adjusted_close" => Ok(BarField::AdjClose),
            "volume" => Ok(BarField::Volume),
            other => Err(format!("unknown bar field '{}'", other)),
        }
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
