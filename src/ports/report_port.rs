//! Report boundary: persists the outcome of a run.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ReplayError;

pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), ReplayError>;
}
