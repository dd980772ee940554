//! Bar source boundary.

use crate::domain::error::ReplayError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// Every bar available for `symbol`, in any order. The bar store sorts and
    /// aligns them.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, ReplayError>;

    fn list_symbols(&self) -> Result<Vec<String>, ReplayError>;
}
