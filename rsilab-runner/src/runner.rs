//! Backtest runner — wires together ingestion, session filter, engine, and statistics.
//!
//! Entry points:
//! - `run_from_config()`: loads the CSV named in the config, then runs. Used by the CLI.
//! - `run_backtest()`: takes pre-loaded raw bars. Used by tests and synthetic runs.
//! - `run_backtest_cancellable()`: as above, with a cancellation flag.

use std::sync::atomic::AtomicBool;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use rsilab_core::domain::{Bar, LedgerRow};
use rsilab_core::engine::{run_simulation, EngineError, ProgressEvent};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_csv, LoadError, RawBar};
use crate::metrics::PerformanceStats;
use crate::session_filter::apply_session;
use crate::summary::{daily_summary, DailySummary};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("no bars fall inside the session window ({raw} raw bars)")]
    NoBarsInSession { raw: usize },
    #[error("config has no [data] path")]
    MissingDataPath,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// A session bar annotated with its indicator value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub timestamp: DateTime<Utc>,
    pub session_date: NaiveDate,
    pub close: f64,
    pub rsi: Option<f64>,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    pub schema_version: u32,
    pub symbol: String,
    pub run_id: RunId,
    pub config: BacktestConfig,
    /// Session-filtered bars, parallel to `ledger`.
    pub bars: Vec<BarRecord>,
    pub ledger: Vec<LedgerRow>,
    pub daily: Vec<DailySummary>,
    pub stats: PerformanceStats,
    /// BLAKE3 over the ledger rows.
    pub ledger_hash: String,
    /// BLAKE3 over the session-filtered bars.
    pub dataset_hash: String,
}

/// Run the backtest described by `config`, reading bars from its `[data]` path.
pub fn run_from_config(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let path = config.data_path().ok_or(RunError::MissingDataPath)?;
    let raw = load_csv(path)?;
    run_backtest(config, &raw, None)
}

/// Run a backtest over pre-loaded raw bars — no I/O.
pub fn run_backtest(
    config: &BacktestConfig,
    raw: &[RawBar],
    progress: Option<&dyn Fn(&ProgressEvent)>,
) -> Result<BacktestResult, RunError> {
    run_backtest_cancellable(config, raw, progress, None)
}

/// Run a backtest that stops with [`EngineError::Cancelled`] once `cancel` is set.
pub fn run_backtest_cancellable(
    config: &BacktestConfig,
    raw: &[RawBar],
    progress: Option<&dyn Fn(&ProgressEvent)>,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    let window = config.session_window()?;
    let sim_config = config.to_simulation_config();

    let bars = apply_session(raw, &window);
    if bars.is_empty() {
        return Err(RunError::NoBarsInSession { raw: raw.len() });
    }

    let run = run_simulation(&bars, &sim_config, progress, cancel)?;
    let daily = daily_summary(&bars, &run.ledger);
    let stats = PerformanceStats::compute(&daily, run.signal_counts());
    let ledger_hash = ledger_hash(&run.ledger);
    let dataset_hash = dataset_hash(&bars);

    info!(
        symbol = %config.backtest.symbol,
        days = daily.len(),
        sharpe = stats.sharpe_ratio,
        geometric_return = stats.geometric_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: config.backtest.symbol.clone(),
        run_id: config.run_id(),
        config: config.clone(),
        bars: annotate(&bars, &run.rsi),
        ledger: run.ledger,
        daily,
        stats,
        ledger_hash,
        dataset_hash,
    })
}

fn annotate(bars: &[Bar], rsi: &[Option<f64>]) -> Vec<BarRecord> {
    bars.iter()
        .zip(rsi)
        .map(|(bar, &rsi)| BarRecord {
            timestamp: bar.timestamp,
            session_date: bar.session_date,
            close: bar.close,
            rsi,
        })
        .collect()
}

/// Deterministic BLAKE3 hash over every field of every ledger row.
pub fn ledger_hash(ledger: &[LedgerRow]) -> String {
    let mut hasher = blake3::Hasher::new();
    for row in ledger {
        hasher.update(&row.cash.to_le_bytes());
        hasher.update(&row.shares.to_le_bytes());
        hasher.update(&row.portfolio_value.to_le_bytes());
        hasher.update(row.signal.code().as_bytes());
        hasher.update(&[u8::from(row.stoploss_fired), b'\n']);
    }
    hasher.finalize().to_hex().to_string()
}

/// BLAKE3 over the timestamp and close of every bar that reached the engine.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
