//! Events exchanged between the bar store, strategy, portfolio and execution.
//!
//! Quantities on orders and fills are always non-negative; the direction
//! carries the sign.

use chrono::NaiveDateTime;
use std::fmt;

/// Direction recommended by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalDirection {
    Long,
    Short,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    Buy,
    Sell,
}

impl OrderDirection {
    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            OrderDirection::Buy => 1,
            OrderDirection::Sell => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub strategy_id: u32,
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub direction: SignalDirection,
    /// Scales order size; 1.0 is one full unit.
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub symbol: String,
    pub kind: OrderKind,
    pub quantity: u64,
    pub direction: OrderDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillEvent {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub venue: String,
    pub quantity: u64,
    pub direction: OrderDirection,
    /// Per-unit execution price.
    pub fill_cost: f64,
    pub commission: f64,
}

/// A discrete occurrence driving the simulation. Exactly one variant is active.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new bar is available for every symbol at the current step.
    Market,
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl SignalEvent {
    pub fn new(
        strategy_id: u32,
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        direction: SignalDirection,
        strength: f64,
    ) -> Self {
        SignalEvent {
            strategy_id,
            symbol: symbol.into(),
            timestamp,
            direction,
            strength: strength.max(0.0),
        }
    }
}

impl OrderEvent {
    pub fn market(symbol: impl Into<String>, quantity: u64, direction: OrderDirection) -> Self {
        OrderEvent {
            symbol: symbol.into(),
            kind: OrderKind::Market,
            quantity,
            direction,
        }
    }
}

impl FillEvent {
    /// Build a fill; when `commission` is `None` it is derived from the
    /// quantity with [`ib_commission`].
    pub fn new(
        timestamp: NaiveDateTime,
        symbol: impl Into<String>,
        venue: impl Into<String>,
        quantity: u64,
        direction: OrderDirection,
        fill_cost: f64,
        commission: Option<f64>,
    ) -> Self {
        FillEvent {
            timestamp,
            symbol: symbol.into(),
            venue: venue.into(),
            quantity,
            direction,
            fill_cost,
            commission: commission.unwrap_or_else(|| ib_commission(quantity)),
        }
    }

    /// Signed cash flow of this fill: −sign·fill_cost·quantity − commission.
    pub fn cash_flow(&self) -> f64 {
        -(self.direction.sign() as f64) * self.fill_cost * self.quantity as f64 - self.commission
    }
}

/// Interactive Brokers "US API directed order" tiering, in the fill currency.
///
/// max(1.3, 0.013·q) up to 500 units, max(1.3, 0.008·q) above.
pub fn ib_commission(quantity: u64) -> f64 {
    let q = quantity as f64;
    if quantity <= 500 {
        (0.013 * q).max(1.3)
    } else {
        (0.008 * q).max(1.3)
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDirection::Long => f.write_str("LONG"),
            SignalDirection::Short => f.write_str("SHORT"),
            SignalDirection::Exit => f.write_str("EXIT"),
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::Market => f.write_str("MKT"),
            OrderKind::Limit => f.write_str("LMT"),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Buy => f.write_str("BUY"),
            OrderDirection::Sell => f.write_str("SELL"),
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Order: Symbol={}, Type={}, Quantity={}, Direction={}",
            self.symbol, self.kind, self.quantity, self.direction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
    }

    #[test]
    fn commission_floor_applies_to_small_orders() {
        assert_relative_eq!(ib_commission(100), 1.3, epsilon = 1e-9);
        assert_relative_eq!(ib_commission(1), 1.3, epsilon = 1e-9);
        assert_relative_eq!(ib_commission(0), 1.3, epsilon = 1e-9);
    }

    #[test]
    fn commission_lower_tier_rate() {
        assert_relative_eq!(ib_commission(500), 6.5, epsilon = 1e-9);
        assert_relative_eq!(ib_commission(200), 2.6, epsilon = 1e-9);
    }

    #[test]
    fn commission_upper_tier_rate() {
        assert_relative_eq!(ib_commission(1000), 8.0, epsilon = 1e-9);
        assert_relative_eq!(ib_commission(501), 4.008, epsilon = 1e-9);
    }

    #[test]
    fn fill_derives_commission_when_missing() {
        let fill = FillEvent::new(ts(), "AAPL", "ARCA", 1000, OrderDirection::Buy, 10.0, None);
        assert_relative_eq!(fill.commission, 8.0, epsilon = 1e-9);
    }

    #[test]
    fn fill_keeps_supplied_commission() {
        let fill = FillEvent::new(
            ts(),
            "AAPL",
            "ARCA",
            1000,
            OrderDirection::Buy,
            10.0,
            Some(0.5),
        );
        assert_relative_eq!(fill.commission, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn cash_flow_signs() {
        let buy = FillEvent::new(ts(), "AAPL", "ARCA", 100, OrderDirection::Buy, 10.0, None);
        assert_relative_eq!(buy.cash_flow(), -1001.3, epsilon = 1e-9);

        let sell = FillEvent::new(ts(), "AAPL", "ARCA", 100, OrderDirection::Sell, 10.0, None);
        assert_relative_eq!(sell.cash_flow(), 998.7, epsilon = 1e-9);
    }

    #[test]
    fn signal_strength_is_never_negative() {
        let signal = SignalEvent::new(1, "AAPL", ts(), SignalDirection::Long, -2.0);
        assert_eq!(signal.strength, 0.0);
    }

    #[test]
    fn order_direction_sign() {
        assert_eq!(OrderDirection::Buy.sign(), 1);
        assert_eq!(OrderDirection::Sell.sign(), -1);
    }

    #[test]
    fn order_display() {
        let order = OrderEvent::market("AAPL", 100, OrderDirection::Buy);
        assert_eq!(
            order.to_string(),
            "Order: Symbol=AAPL, Type=MKT, Quantity=100, Direction=BUY"
        );
    }
}
