//! Performance statistics derived from the holdings history.
//!
//! Everything here is a pure function of its inputs. Degenerate inputs
//! (no returns, zero variance) produce `f64::NAN` rather than an error.

use chrono::NaiveDateTime;
use statrs::distribution::{ContinuousCDF, Normal};

use super::position::HoldingsSnapshot;
use super::stats::{mean, population_stddev};

/// Confidence level used for the value-at-risk figure in [`Summary`].
pub const VAR_CONFIDENCE: f64 = 0.99;

/// Annualised Sharpe ratio with a zero benchmark: `sqrt(periods) * mean / stdev`,
/// using the population standard deviation.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    match (mean(returns), population_stddev(returns)) {
        (Some(m), Some(sd)) if sd > 0.0 => periods_per_year.sqrt() * m / sd,
        _ => f64::NAN,
    }
}

/// Drawdown from the running high-water mark of `equity`.
///
/// Returns the drawdown series (`hwm - equity`, same length as the input), the
/// largest drawdown and the longest run of consecutive non-zero drawdown steps.
pub fn drawdowns(equity: &[f64]) -> (Vec<f64>, f64, usize) {
    let mut series = Vec::with_capacity(equity.len());
    let mut hwm = f64::NEG_INFINITY;
    let mut duration = 0usize;
    let mut max_drawdown = 0.0_f64;
    let mut max_duration = 0usize;

    for &value in equity {
        hwm = hwm.max(value);
        let drawdown = hwm - value;
        duration = if drawdown == 0.0 { 0 } else { duration + 1 };
        max_drawdown = max_drawdown.max(drawdown);
        max_duration = max_duration.max(duration);
        series.push(drawdown);
    }

    (series, max_drawdown, max_duration)
}

/// Variance-covariance value at risk of a position worth `value` at
/// confidence `confidence`, for returns distributed N(`mu`, `sigma`).
pub fn var_cov_var(value: f64, confidence: f64, mu: f64, sigma: f64) -> f64 {
    if !(sigma > 0.0) || !(confidence > 0.0 && confidence < 1.0) {
        return f64::NAN;
    }
    let Ok(returns) = Normal::new(mu, sigma) else {
        return f64::NAN;
    };
    let alpha = returns.inverse_cdf(1.0 - confidence);
    value - value * (alpha + 1.0)
}

/// One row of the equity curve.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub commission: f64,
    pub total: f64,
    /// Fractional change of `total` from the previous row; 0 on the first row.
    pub returns: f64,
    /// Cumulative product of `1 + returns`, starting at 1.
    pub equity_curve: f64,
    pub drawdown: f64,
}

/// Equity curve built once from the holdings history at the end of a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn from_holdings(holdings: &[HoldingsSnapshot]) -> Self {
        let mut points: Vec<EquityPoint> = Vec::with_capacity(holdings.len());
        let mut equity = 1.0;
        let mut previous_total: Option<f64> = None;

        for h in holdings {
            let returns = match previous_total {
                Some(prev) if prev != 0.0 => h.total / prev - 1.0,
                _ => 0.0,
            };
            equity *= 1.0 + returns;
            previous_total = Some(h.total);
            points.push(EquityPoint {
                timestamp: h.timestamp,
                cash: h.cash,
                commission: h.commission,
                total: h.total,
                returns,
                equity_curve: equity,
                drawdown: 0.0,
            });
        }

        let equity: Vec<f64> = points.iter().map(|p| p.equity_curve).collect();
        let (series, _, _) = drawdowns(&equity);
        for (point, dd) in points.iter_mut().zip(series) {
            point.drawdown = dd;
        }

        EquityCurve { points }
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Period returns, excluding the undefined first row.
    pub fn returns(&self) -> Vec<f64> {
        self.points.iter().skip(1).map(|p| p.returns).collect()
    }

    pub fn equity(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity_curve).collect()
    }

    pub fn final_total(&self) -> Option<f64> {
        self.points.last().map(|p| p.total)
    }
}

/// End-of-run statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub drawdown_duration: usize,
    /// One-period value at risk of the final portfolio value at [`VAR_CONFIDENCE`].
    pub value_at_risk_99: f64,
}

impl Summary {
    pub fn from_curve(curve: &EquityCurve, periods_per_year: f64) -> Self {
        let returns = curve.returns();
        let equity = curve.equity();
        let (_, max_drawdown, drawdown_duration) = drawdowns(&equity);

        let total_return = equity.last().map(|e| e - 1.0).unwrap_or(0.0);
        let value_at_risk_99 = match (
            curve.final_total(),
            mean(&returns),
            population_stddev(&returns),
        ) {
            (Some(total), Some(mu), Some(sigma)) => var_cov_var(total, VAR_CONFIDENCE, mu, sigma),
            _ => f64::NAN,
        };

        Summary {
            total_return,
            sharpe_ratio: sharpe_ratio(&returns, periods_per_year),
            max_drawdown,
            drawdown_duration,
            value_at_risk_99,
        }
    }
}
