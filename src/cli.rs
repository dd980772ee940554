//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{Backtest, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{parse_symbols, validate_all};
use crate::domain::error::ReplayError;
use crate::domain::execution::{CommissionModel, DEFAULT_VENUE};
use crate::domain::ohlcv::{parse_timestamp, BarField};
use crate::domain::sizing::SizingConfig;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "replaytrader", about = "Event-driven bar replay backtester")]
pub struct Cli {
    /// Log filter, e.g. `info` or `replaytrader=debug`
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of `<SYMBOL>.csv` files; overrides `[backtest] data_dir`
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Equity curve CSV destination
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a run configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean for
/// command output.
pub fn init_tracing(log_level: &str, log_format: LogFormat) -> Result<(), String> {
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    match log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
            .map_err(|err| format!("failed to install subscriber: {err}")),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|err| format!("failed to install subscriber: {err}")),
    }
}

pub fn run(cli: Cli) -> ExitCode {
    if let Err(e) = init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, data_dir.as_deref(), output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir, config } => {
            run_list_symbols(data_dir.as_deref(), config.as_deref())
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(config_path: &Path, data_dir: Option<&Path>, output_path: Option<&Path>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate every section
    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: Build run parameters
    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let strategy_config = match build_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Strategy: {}", strategy_config);

    // Stage 4: Resolve the bar source
    let data_dir = match resolve_data_dir(data_dir, &adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Reading bars from {}", data_dir.display());
    let data_port = CsvAdapter::new(data_dir);

    let output = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("equity.csv"));

    run_backtest_pipeline(&data_port, bt_config, &strategy_config, &output)
}

/// Stages 5-7: replay, summarise, write the equity curve.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    bt_config: BacktestConfig,
    strategy_config: &StrategyConfig,
    output_path: &Path,
) -> ExitCode {
    // Stage 5: Replay
    eprintln!(
        "Running backtest: {} symbols from {}",
        bt_config.symbols.len(),
        bt_config.start
    );
    let result = match Backtest::from_port(bt_config, strategy_config, data_port)
        .and_then(|backtest| backtest.run())
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 6: Console summary
    print_summary(&result);

    // Stage 7: Equity curve report
    match CsvReportAdapter.write(&result, output_path) {
        Ok(()) => {
            eprintln!("\nEquity curve written to: {}", output_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn print_summary(result: &BacktestResult) {
    let summary = &result.summary;
    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", summary.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.2}%", summary.max_drawdown * 100.0);
    eprintln!("Drawdown Length:  {}", summary.drawdown_duration);
    eprintln!("VaR (99%):        {:.2}", summary.value_at_risk_99);
    eprintln!("Final Equity:     {:.2}", result.final_holdings.total);
    eprintln!("Commission:       {:.2}", result.final_holdings.commission);
    eprintln!("Signals:          {}", result.counters.signals);
    eprintln!("Orders:           {}", result.counters.orders);
    eprintln!("Fills:            {}", result.counters.fills);

    if !result.final_positions.is_empty() {
        eprintln!("\n=== Final Positions ===");
        for (symbol, quantity) in &result.final_positions {
            eprintln!("  {}:  {}", symbol, quantity);
        }
    }
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Config validated successfully");

    let configs = build_backtest_config(&adapter)
        .and_then(|bt| build_strategy_config(&adapter).map(|s| (bt, s)));
    let (bt_config, strategy_config) = match configs {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nRun:");
    eprintln!("  symbols:         {}", bt_config.symbols.join(", "));
    eprintln!("  start:           {}", bt_config.start);
    eprintln!("  initial capital: {:.2}", bt_config.initial_capital);
    eprintln!("  price field:     {}", bt_config.price_field);
    eprintln!("  sizing:          {:?}", bt_config.sizing);
    eprintln!("  venue:           {}", bt_config.venue);
    eprintln!("  commission:      {:?}", bt_config.commission);
    eprintln!("\nStrategy:");
    eprintln!("  {}", strategy_config);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_all(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    match build_strategy_config(&adapter) {
        Ok(strategy) => {
            eprintln!("  Strategy: {}", strategy);
            eprintln!("\nConfiguration is valid");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list_symbols(data_dir: Option<&Path>, config_path: Option<&Path>) -> ExitCode {
    let config = match config_path {
        Some(path) => match load_config(path) {
            Ok(c) => Some(c),
            Err(code) => return code,
        },
        None => None,
    };

    let dir = match (data_dir, config.as_ref()) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(config)) => match resolve_data_dir(None, config) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
        (None, None) => {
            eprintln!("error: --data-dir or --config is required for list-symbols");
            return ExitCode::from(2);
        }
    };

    let symbols = match CsvAdapter::new(dir.clone()).list_symbols() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

/// `--data-dir` wins over `[backtest] data_dir`.
pub fn resolve_data_dir(
    data_dir: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, ReplayError> {
    if let Some(dir) = data_dir {
        return Ok(dir.to_path_buf());
    }
    config
        .get_string("backtest", "data_dir")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ReplayError::ConfigMissing {
            section: "backtest".into(),
            key: "data_dir".into(),
        })
}

fn parse_field(config: &dyn ConfigPort, section: &str, default: BarField) -> Result<BarField, ReplayError> {
    match config.get_string(section, "price_field") {
        Some(value) => value
            .parse()
            .map_err(|reason: String| ReplayError::invalid(section, "price_field", reason)),
        None => Ok(default),
    }
}

fn symbols_of(config: &dyn ConfigPort) -> Vec<String> {
    config
        .get_string("backtest", "symbols")
        .map(|s| parse_symbols(&s))
        .unwrap_or_default()
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, ReplayError> {
    let symbols = symbols_of(adapter);
    if symbols.is_empty() {
        return Err(ReplayError::ConfigMissing {
            section: "backtest".into(),
            key: "symbols".into(),
        });
    }

    let start_str = adapter
        .get_string("backtest", "start_date")
        .ok_or_else(|| ReplayError::ConfigMissing {
            section: "backtest".into(),
            key: "start_date".into(),
        })?;
    let start = parse_timestamp(&start_str).ok_or_else(|| {
        ReplayError::invalid(
            "backtest",
            "start_date",
            "invalid date format (expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)",
        )
    })?;

    let heartbeat_ms = adapter.get_int("backtest", "heartbeat_ms", 0);
    let heartbeat = u64::try_from(heartbeat_ms)
        .map(Duration::from_millis)
        .map_err(|_| ReplayError::invalid("backtest", "heartbeat_ms", "must be non-negative"))?;

    let sizing = match adapter
        .get_string("portfolio", "sizing")
        .unwrap_or_else(|| "fixed".to_string())
        .trim()
    {
        "fixed" => {
            let base = adapter.get_int("portfolio", "base_quantity", 100);
            SizingConfig::Fixed {
                base_quantity: u64::try_from(base).map_err(|_| {
                    ReplayError::invalid("portfolio", "base_quantity", "must be non-negative")
                })?,
            }
        }
        "cash_fraction" => SizingConfig::CashFraction {
            fraction: adapter.get_double("portfolio", "cash_fraction", 0.1),
        },
        other => {
            return Err(ReplayError::invalid(
                "portfolio",
                "sizing",
                format!("unknown sizing '{other}'"),
            ));
        }
    };

    let commission = match adapter.get_string("execution", "commission") {
        None => CommissionModel::Ib,
        Some(value) if value.trim().eq_ignore_ascii_case("ib") => CommissionModel::Ib,
        Some(value) => value
            .trim()
            .parse::<f64>()
            .map(CommissionModel::Fixed)
            .map_err(|_| {
                ReplayError::invalid("execution", "commission", "expected 'ib' or a number")
            })?,
    };

    Ok(BacktestConfig {
        symbols,
        initial_capital: adapter.get_double("backtest", "initial_capital", 100_000.0),
        start,
        heartbeat,
        periods_per_year: adapter.get_double("backtest", "periods_per_year", 252.0),
        price_field: parse_field(adapter, "backtest", BarField::Close)?,
        sizing,
        venue: adapter
            .get_string("execution", "venue")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_VENUE.to_string()),
        commission,
    })
}

pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, ReplayError> {
    let kind = adapter
        .get_string("strategy", "kind")
        .ok_or_else(|| ReplayError::ConfigMissing {
            section: "strategy".into(),
            key: "kind".into(),
        })?;

    let window = |key: &str, default: i64| -> Result<usize, ReplayError> {
        usize::try_from(adapter.get_int("strategy", key, default))
            .map_err(|_| ReplayError::invalid("strategy", key, "must be non-negative"))
    };

    match kind.trim() {
        "buy_and_hold" => Ok(StrategyConfig::BuyAndHold),
        "ma_cross" => Ok(StrategyConfig::MovingAverageCross {
            short_window: window("short_window", 100)?,
            long_window: window("long_window", 400)?,
            price_field: parse_field(adapter, "strategy", BarField::AdjClose)?,
        }),
        "pairs_ols" => {
            let pair = match adapter.get_string("strategy", "pair") {
                Some(value) => parse_symbols(&value),
                None => symbols_of(adapter).into_iter().take(2).collect(),
            };
            let [y, x]: [String; 2] = pair.try_into().map_err(|_| {
                ReplayError::invalid("strategy", "pair", "expected exactly two symbols")
            })?;
            Ok(StrategyConfig::PairsOls {
                ols_window: window("ols_window", 100)?,
                zscore_low: adapter.get_double("strategy", "zscore_low", 0.5),
                zscore_high: adapter.get_double("strategy", "zscore_high", 3.0),
                pair: (y, x),
            })
        }
        other => Err(ReplayError::invalid(
            "strategy",
            "kind",
            format!("unknown strategy '{other}'"),
        )),
    }
}
