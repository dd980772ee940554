//! Order sizing policies used by the portfolio when turning a signal into an order.

use super::event::SignalEvent;

/// Decides how many units an entry signal should buy or sell.
///
/// `price` is the latest mark for the signal's symbol, if one is known.
pub trait PositionSizer {
    fn quantity(&self, signal: &SignalEvent, cash: f64, price: Option<f64>) -> u64;
}

/// `floor(base_quantity * strength)`, independent of cash and price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedUnitSizer {
    pub base_quantity: u64,
}

impl Default for FixedUnitSizer {
    fn default() -> Self {
        FixedUnitSizer { base_quantity: 100 }
    }
}

impl PositionSizer for FixedUnitSizer {
    fn quantity(&self, signal: &SignalEvent, _cash: f64, _price: Option<f64>) -> u64 {
        floor_units(self.base_quantity as f64 * signal.strength)
    }
}

/// Commits a fraction of available cash, scaled by signal strength:
/// `floor(cash * fraction * strength / price)`. Without a positive price or
/// positive cash the size is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFractionSizer {
    pub fraction: f64,
}

impl PositionSizer for CashFractionSizer {
    fn quantity(&self, signal: &SignalEvent, cash: f64, price: Option<f64>) -> u64 {
        match price {
            Some(p) if p > 0.0 && cash > 0.0 => {
                floor_units(cash * self.fraction * signal.strength / p)
            }
            _ => 0,
        }
    }
}

/// Sizing policy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingConfig {
    Fixed { base_quantity: u64 },
    CashFraction { fraction: f64 },
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig::Fixed { base_quantity: 100 }
    }
}

impl SizingConfig {
    pub fn build(self) -> Box<dyn PositionSizer> {
        match self {
            SizingConfig::Fixed { base_quantity } => Box::new(FixedUnitSizer { base_quantity }),
            SizingConfig::CashFraction { fraction } => Box::new(CashFractionSizer { fraction }),
        }
    }
}

fn floor_units(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}
