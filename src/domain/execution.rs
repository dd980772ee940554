//! Order execution.
//!
//! An [`ExecutionHandler`] turns every order into exactly one fill. The
//! simulated handler fills immediately and in full at the latest bar's price;
//! there is no slippage, latency or partial fill.

use tracing::debug;

use super::bar_store::BarStore;
use super::error::ReplayError;
use super::event::{FillEvent, OrderEvent};
use super::ohlcv::BarField;

/// Venue stamped on simulated fills.
pub const DEFAULT_VENUE: &str = "ARCA";

pub trait ExecutionHandler {
    fn execute(&mut self, order: &OrderEvent, bars: &dyn BarStore) -> Result<FillEvent, ReplayError>;
}

/// How commission is charged on a fill.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CommissionModel {
    /// Tiered per-unit commission from [`ib_commission`](super::event::ib_commission).
    #[default]
    Ib,
    /// Flat amount per fill.
    Fixed(f64),
}

impl CommissionModel {
    fn override_for_fill(self) -> Option<f64> {
        match self {
            CommissionModel::Ib => None,
            CommissionModel::Fixed(amount) => Some(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedExecutionHandler {
    venue: String,
    price_field: BarField,
    commission: CommissionModel,
}

impl Default for SimulatedExecutionHandler {
    fn default() -> Self {
        SimulatedExecutionHandler {
            venue: DEFAULT_VENUE.to_string(),
            price_field: BarField::Close,
            commission: CommissionModel::Ib,
        }
    }
}

impl SimulatedExecutionHandler {
    pub fn new(venue: impl Into<String>, price_field: BarField, commission: CommissionModel) -> Self {
        SimulatedExecutionHandler {
            venue: venue.into(),
            price_field,
            commission,
        }
    }
}

impl ExecutionHandler for SimulatedExecutionHandler {
    /// Fill at the latest bar's price field, stamped with that bar's timestamp.
    /// Limit orders are filled the same way as market orders.
    fn execute(&mut self, order: &OrderEvent, bars: &dyn BarStore) -> Result<FillEvent, ReplayError> {
        let bar = bars
            .get_latest_bar(&order.symbol)?
            .ok_or_else(|| ReplayError::NoData {
                symbol: order.symbol.clone(),
            })?;

        let fill = FillEvent::new(
            bar.timestamp,
            order.symbol.clone(),
            self.venue.clone(),
            order.quantity,
            order.direction,
            bar.value(self.price_field),
            self.commission.override_for_fill(),
        );
        debug!(
            %order,
            fill_cost = fill.fill_cost,
            commission = fill.commission,
            venue = %fill.venue,
            "order filled"
        );
        Ok(fill)
    }
}
