//! RSI Lab CLI — run the intraday RSI backtest.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file, a CSV file, or
//!   synthetic minute bars, print the statistics, and save artifacts

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rsilab_core::engine::{channel_progress, ProgressEvent};
use rsilab_runner::export::format_stat;
use rsilab_runner::{
    load_csv, run_backtest, save_artifacts, synthetic_minute_bars, BacktestConfig,
    BacktestResult, RawBar,
};

#[derive(Parser)]
#[command(
    name = "rsilab",
    about = "RSI Lab CLI — intraday RSI mean-reversion backtester"
)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest and save its artifacts.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file with `t` (epoch ms) and `c` (close) columns. Overrides the config's data path.
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate this many weekdays of synthetic minute bars instead of reading a CSV.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for synthetic bars.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// First date for synthetic bars (YYYY-MM-DD).
    #[arg(long, default_value = "2024-01-02")]
    synthetic_start: String,

    /// Instrument symbol.
    #[arg(long)]
    symbol: Option<String>,

    /// Starting cash.
    #[arg(long)]
    initial_capital: Option<f64>,

    /// Capital committed per buy, in percent of initial capital.
    #[arg(long)]
    trade_pct: Option<f64>,

    /// Bar-over-bar loss that triggers the stoploss, in percent of initial capital.
    #[arg(long)]
    stoploss_pct: Option<f64>,

    /// Halt trading for the rest of the day after a stoploss.
    #[arg(long, default_value_t = false)]
    kill_switch: bool,

    /// Output directory for artifacts.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run(args) => run_backtest_cmd(args),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

fn run_backtest_cmd(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let raw = load_raw_bars(&args, &config)?;

    let (tx, rx) = mpsc::channel::<ProgressEvent>();
    let result = std::thread::scope(|s| {
        s.spawn(move || {
            for event in rx {
                debug!(
                    processed = event.processed,
                    total = event.total,
                    percent = event.percent(),
                    "progress"
                );
            }
        });
        let progress = channel_progress(tx);
        let callback: &dyn Fn(&ProgressEvent) = &progress;
        run_backtest(&config, &raw, Some(callback))
    })?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, &args.output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

/// Start from the config file (or defaults) and apply command-line overrides.
fn build_config(args: &RunArgs) -> Result<BacktestConfig> {
    let mut config = match &args.config {
        Some(path) => BacktestConfig::from_file(path)?,
        None => BacktestConfig::default(),
    };

    let b = &mut config.backtest;
    if let Some(symbol) = &args.symbol {
        b.symbol = symbol.clone();
    }
    if let Some(capital) = args.initial_capital {
        b.initial_capital = capital;
    }
    if let Some(pct) = args.trade_pct {
        b.trade_fraction = pct / 100.0;
    }
    if let Some(pct) = args.stoploss_pct {
        b.stoploss_fraction = pct / 100.0;
    }
    if args.kill_switch {
        b.kill_switch = true;
    }
    Ok(config)
}

fn load_raw_bars(args: &RunArgs, config: &BacktestConfig) -> Result<Vec<RawBar>> {
    if let Some(days) = args.synthetic {
        if days == 0 {
            bail!("--synthetic needs at least one day");
        }
        let start = NaiveDate::parse_from_str(&args.synthetic_start, "%Y-%m-%d")
            .with_context(|| format!("invalid --synthetic-start '{}'", args.synthetic_start))?;
        info!(days, seed = args.seed, "using synthetic minute bars");
        return Ok(synthetic_minute_bars(days, args.seed, start));
    }

    let path: &Path = match (&args.data, config.data_path()) {
        (Some(path), _) => path,
        (None, Some(path)) => path,
        (None, None) => {
            bail!("one of --data, --synthetic, or a config with a [data] path is required")
        }
    };
    load_csv(path).with_context(|| format!("failed to load bars from {}", path.display()))
}

fn print_summary(result: &BacktestResult) {
    let s = &result.stats;
    let b = &result.config.backtest;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    if let (Some(first), Some(last)) = (result.daily.first(), result.daily.last()) {
        println!(
            "Period:         {} to {}",
            first.session_date, last.session_date
        );
    }
    println!("Bars:           {}", result.bars.len());
    println!("Days:           {}", s.trading_days);
    println!(
        "Kill Switch:    {}",
        if b.kill_switch { "on" } else { "off" }
    );
    println!();
    println!("--- Performance ---");
    println!("Geometric Return:    {}%", format_stat(s.geometric_return));
    println!("Mean Annual Return:  {}%", format_stat(s.mean_annual_return));
    println!("Annual Volatility:   {}%", format_stat(s.annual_volatility));
    println!("Sharpe Ratio:        {}", format_stat(s.sharpe_ratio));
    println!("Final Equity:        {}", format_stat(s.final_equity));
    println!();
    println!("--- Trades ---");
    println!("Buys:           {}", s.buy_count);
    println!("Sells:          {}", s.sell_count);
    println!("Stoplosses:     {}", s.stoploss_count);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Run(run) => run,
        }
    }

    #[test]
    fn percent_flags_become_fractions() {
        let args = parse(&[
            "rsilab",
            "run",
            "--synthetic",
            "2",
            "--trade-pct",
            "50",
            "--stoploss-pct",
            "1",
            "--kill-switch",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.backtest.trade_fraction, 0.5);
        assert_eq!(config.backtest.stoploss_fraction, 0.01);
        assert!(config.backtest.kill_switch);
    }

    #[test]
    fn defaults_without_overrides() {
        let args = parse(&["rsilab", "run", "--synthetic", "1"]);
        assert_eq!(build_config(&args).unwrap(), BacktestConfig::default());
        assert_eq!(args.output_dir, PathBuf::from("results"));
    }

    #[test]
    fn data_and_synthetic_conflict() {
        let parsed = Cli::try_parse_from(["rsilab", "run", "--data", "x.csv", "--synthetic", "1"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn missing_source_is_an_error() {
        let args = parse(&["rsilab", "run"]);
        let config = build_config(&args).unwrap();
        assert!(load_raw_bars(&args, &config).is_err());
    }

    #[test]
    fn synthetic_source_generates_bars() {
        let args = parse(&["rsilab", "run", "--synthetic", "1", "--seed", "3"]);
        let config = build_config(&args).unwrap();
        assert_eq!(load_raw_bars(&args, &config).unwrap().len(), 391);
    }
}
