//! CSV bar source: one `<SYMBOL>.csv` per symbol in a directory.
//!
//! Files carry a header row followed by
//! `datetime,open,low,high,close,adj_close,volume` records.

use std::fs;
use std::path::PathBuf;

use crate::domain::error::ReplayError;
use crate::domain::ohlcv::{parse_timestamp, Bar};
use crate::ports::data_port::DataPort;

pub const CSV_COLUMNS: [&str; 7] = [
    "datetime",
    "open",
    "low",
    "high",
    "close",
    "adj_close",
    "volume",
];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn data_error(reason: impl Into<String>) -> ReplayError {
    ReplayError::DataSource {
        reason: reason.into(),
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    line: u64,
) -> Result<T, ReplayError>
where
    T::Err: std::fmt::Display,
{
    let raw = record
        .get(index)
        .ok_or_else(|| data_error(format!("line {line}: missing {} column", CSV_COLUMNS[index])))?;
    raw.trim().parse().map_err(|e| {
        data_error(format!(
            "line {line}: invalid {} value '{raw}': {e}",
            CSV_COLUMNS[index]
        ))
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, ReplayError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("{}: CSV parse error: {}", path.display(), e)))?;
        let found: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        if found != CSV_COLUMNS {
            return Err(data_error(format!(
                "{}: unexpected header '{}', expected '{}'",
                path.display(),
                found.join(","),
                CSV_COLUMNS.join(",")
            )));
        }

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let raw_ts = record
                .get(0)
                .ok_or_else(|| data_error(format!("line {line}: missing datetime column")))?;
            let timestamp = parse_timestamp(raw_ts)
                .ok_or_else(|| data_error(format!("line {line}: invalid datetime '{raw_ts}'")))?;

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp,
                open: parse_field(&record, 1, line)?,
                low: parse_field(&record, 2, line)?,
                high: parse_field(&record, 3, line)?,
                close: parse_field(&record, 4, line)?,
                adj_close: parse_field(&record, 5, line)?,
                volume: parse_field(&record, 6, line)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ReplayError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const HEADER: &str = "datetime,open,low,high,close,adj_close,volume\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = format!(
            "{HEADER}\
            2024-01-16,105.0,100.0,115.0,110.0,109.5,60000\n\
            2024-01-15,100.0,90.0,110.0,105.0,104.5,50000\n\
            2024-01-17 16:00:00,110.0,105.0,120.0,115.0,114.5,55000\n"
        );

        fs::write(path.join("BHP.csv"), csv_content).unwrap();
        fs::write(path.join("CBA.csv"), HEADER).unwrap();
        fs::write(path.join("notes.txt"), "not a symbol").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_bars_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_bars("BHP").unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(
            bars[0].timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(bars[0].symbol, "BHP");
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].adj_close, 104.5);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[2].timestamp.to_string(), "2024-01-17 16:00:00");
    }

    #[test]
    fn header_only_file_is_empty() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert!(adapter.fetch_bars("CBA").unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_bars("XYZ").unwrap_err();
        assert!(matches!(err, ReplayError::DataSource { .. }));
    }

    #[test]
    fn wrong_header_is_rejected() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-15,1,1,1,1,10\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_bars("BAD").unwrap_err();
        assert!(err.to_string().contains("unexpected header"));
    }

    #[test]
    fn malformed_value_names_column() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            format!("{HEADER}2024-01-15,1.0,1.0,1.0,oops,1.0,10\n"),
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_bars("BAD").unwrap_err();
        assert!(err.to_string().contains("invalid close value"));
    }

    #[test]
    fn malformed_datetime_is_rejected() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            format!("{HEADER}15/01/2024,1.0,1.0,1.0,1.0,1.0,10\n"),
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_bars("BAD").unwrap_err();
        assert!(err.to_string().contains("invalid datetime"));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["BHP", "CBA"]);
    }

    #[test]
    fn list_symbols_missing_directory_fails() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/replaytrader/data"));
        assert!(adapter.list_symbols().is_err());
    }
}
