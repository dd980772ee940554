//! Configuration validation.
//!
//! Every section is checked before a run starts so a bad value fails fast
//! with the offending `[section] key`.

use crate::domain::error::ReplayError;
use crate::domain::ohlcv::{parse_timestamp, BarField};
use crate::ports::config_port::ConfigPort;

pub const STRATEGY_KINDS: [&str; 3] = ["buy_and_hold", "ma_cross", "pairs_ols"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_symbols(config)?;
    validate_initial_capital(config)?;
    validate_start_date(config)?;
    validate_heartbeat(config)?;
    validate_periods_per_year(config)?;
    validate_price_field(config, "backtest")?;
    Ok(())
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let sizing = config
        .get_string("portfolio", "sizing")
        .unwrap_or_else(|| "fixed".to_string());
    match sizing.trim() {
        "fixed" => {
            if config.get_int("portfolio", "base_quantity", 100) < 1 {
                return Err(ReplayError::invalid(
                    "portfolio",
                    "base_quantity",
                    "base_quantity must be at least 1",
                ));
            }
        }
        "cash_fraction" => {
            let fraction = config.get_double("portfolio", "cash_fraction", 0.1);
            if fraction <= 0.0 || fraction > 1.0 {
                return Err(ReplayError::invalid(
                    "portfolio",
                    "cash_fraction",
                    "cash_fraction must be in (0, 1]",
                ));
            }
        }
        other => {
            return Err(ReplayError::invalid(
                "portfolio",
                "sizing",
                format!("unknown sizing '{other}', expected fixed or cash_fraction"),
            ));
        }
    }
    Ok(())
}

pub fn validate_execution_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if let Some(venue) = config.get_string("execution", "venue") {
        if venue.trim().is_empty() {
            return Err(ReplayError::invalid("execution", "venue", "venue must not be empty"));
        }
    }
    if let Some(commission) = config.get_string("execution", "commission") {
        let commission = commission.trim();
        if !commission.eq_ignore_ascii_case("ib") {
            match commission.parse::<f64>() {
                Ok(v) if v >= 0.0 && v.is_finite() => {}
                _ => {
                    return Err(ReplayError::invalid(
                        "execution",
                        "commission",
                        "commission must be 'ib' or a non-negative number",
                    ));
                }
            }
        }
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let kind = config
        .get_string("strategy", "kind")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ReplayError::ConfigMissing {
            section: "strategy".to_string(),
            key: "kind".to_string(),
        })?;

    match kind.trim() {
        "buy_and_hold" => Ok(()),
        "ma_cross" => validate_ma_cross(config),
        "pairs_ols" => validate_pairs_ols(config),
        other => Err(ReplayError::invalid(
            "strategy",
            "kind",
            format!("unknown strategy '{other}', expected one of {}", STRATEGY_KINDS.join(", ")),
        )),
    }
}

/// Validate every section a backtest reads.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_backtest_config(config)?;
    validate_portfolio_config(config)?;
    validate_execution_config(config)?;
    validate_strategy_config(config)?;
    Ok(())
}

/// Split a comma separated symbol list, dropping blanks.
pub fn parse_symbols(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let symbols = config
        .get_string("backtest", "symbols")
        .map(|s| parse_symbols(&s))
        .unwrap_or_default();
    if symbols.is_empty() {
        return Err(ReplayError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbols".to_string(),
        });
    }
    for (i, symbol) in symbols.iter().enumerate() {
        if symbols[..i].contains(symbol) {
            return Err(ReplayError::invalid(
                "backtest",
                "symbols",
                format!("duplicate symbol {symbol}"),
            ));
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let value = config.get_double("backtest", "initial_capital", 100_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(ReplayError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_start_date(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let value = config
        .get_string("backtest", "start_date")
        .ok_or_else(|| ReplayError::ConfigMissing {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
        })?;
    parse_timestamp(&value).map(|_| ()).ok_or_else(|| {
        ReplayError::invalid(
            "backtest",
            "start_date",
            "invalid start_date format, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
        )
    })
}

fn validate_heartbeat(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if config.get_int("backtest", "heartbeat_ms", 0) < 0 {
        return Err(ReplayError::invalid(
            "backtest",
            "heartbeat_ms",
            "heartbeat_ms must be non-negative",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if config.get_double("backtest", "periods_per_year", 252.0) <= 0.0 {
        return Err(ReplayError::invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_price_field(config: &dyn ConfigPort, section: &str) -> Result<(), ReplayError> {
    match config.get_string(section, "price_field") {
        Some(value) => value
            .parse::<BarField>()
            .map(|_| ())
            .map_err(|reason| ReplayError::invalid(section, "price_field", reason)),
        None => Ok(()),
    }
}

fn validate_ma_cross(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let short = config.get_int("strategy", "short_window", 100);
    let long = config.get_int("strategy", "long_window", 400);
    if short < 1 {
        return Err(ReplayError::invalid(
            "strategy",
            "short_window",
            "short_window must be at least 1",
        ));
    }
    if long <= short {
        return Err(ReplayError::invalid(
            "strategy",
            "long_window",
            "long_window must be greater than short_window",
        ));
    }
    validate_price_field(config, "strategy")
}

fn validate_pairs_ols(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if config.get_int("strategy", "ols_window", 100) < 2 {
        return Err(ReplayError::invalid(
            "strategy",
            "ols_window",
            "ols_window must be at least 2",
        ));
    }

    let low = config.get_double("strategy", "zscore_low", 0.5);
    let high = config.get_double("strategy", "zscore_high", 3.0);
    if low < 0.0 {
        return Err(ReplayError::invalid(
            "strategy",
            "zscore_low",
            "zscore_low must be non-negative",
        ));
    }
    if high <= low {
        return Err(ReplayError::invalid(
            "strategy",
            "zscore_high",
            "zscore_high must be greater than zscore_low",
        ));
    }

    let symbols = config
        .get_string("backtest", "symbols")
        .map(|s| parse_symbols(&s))
        .unwrap_or_default();
    let pair = match config.get_string("strategy", "pair") {
        Some(value) => parse_symbols(&value),
        None => symbols.iter().take(2).cloned().collect(),
    };
    if pair.len() != 2 || pair[0] == pair[1] {
        return Err(ReplayError::invalid(
            "strategy",
            "pair",
            "pair must name two distinct symbols",
        ));
    }
    if let Some(missing) = pair.iter().find(|s| !symbols.contains(s)) {
        return Err(ReplayError::invalid(
            "strategy",
            "pair",
            format!("{missing} is not listed in [backtest] symbols"),
        ));
    }
    Ok(())
}
