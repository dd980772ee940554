//! Writes the equity curve of a run as CSV.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ReplayError;
use crate::ports::report_port::ReportPort;

pub const REPORT_COLUMNS: [&str; 7] = [
    "datetime",
    "cash",
    "commission",
    "total",
    "returns",
    "equity_curve",
    "drawdown",
];

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

fn report_error(path: &Path, e: impl std::fmt::Display) -> ReplayError {
    ReplayError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), ReplayError> {
        let mut writer = csv::Writer::from_path(output_path).map_err(|e| report_error(output_path, e))?;
        writer
            .write_record(REPORT_COLUMNS)
            .map_err(|e| report_error(output_path, e))?;

        for point in result.equity_curve.points() {
            writer
                .write_record([
                    point.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    point.cash.to_string(),
                    point.commission.to_string(),
                    point.total.to_string(),
                    point.returns.to_string(),
                    point.equity_curve.to_string(),
                    point.drawdown.to_string(),
                ])
                .map_err(|e| report_error(output_path, e))?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::RunCounters;
    use crate::domain::performance::{EquityCurve, Summary};
    use crate::domain::position::HoldingsSnapshot;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let holdings: Vec<HoldingsSnapshot> = [100.0, 110.0, 99.0]
            .iter()
            .enumerate()
            .map(|(i, &total)| HoldingsSnapshot {
                timestamp: start + chrono::Duration::days(i as i64),
                market_values: BTreeMap::new(),
                cash: total,
                commission: 0.0,
                total,
            })
            .collect();
        let equity_curve = EquityCurve::from_holdings(&holdings);
        BacktestResult {
            strategy: "buy_and_hold".into(),
            counters: RunCounters::default(),
            summary: Summary::from_curve(&equity_curve, 252.0),
            final_positions: BTreeMap::new(),
            final_holdings: holdings[2].clone(),
            equity_curve,
            stopped: false,
        }
    }

    #[test]
    fn writes_header_and_one_row_per_point() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("equity.csv");
        CsvReportAdapter.write(&sample_result(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "datetime,cash,commission,total,returns,equity_curve,drawdown");
        assert!(lines[1].starts_with("2024-01-01 00:00:00,100,0,100,0,1,0"));
        assert!(lines[2].starts_with("2024-01-02 00:00:00,110,"));
    }

    #[test]
    fn unwritable_path_is_report_error() {
        let err = CsvReportAdapter
            .write(&sample_result(), Path::new("/nonexistent/dir/equity.csv"))
            .unwrap_err();
        assert!(matches!(err, ReplayError::Report { .. }));
    }
}
