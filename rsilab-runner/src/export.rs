//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-bar ledger and day-end summary for external analysis tools
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Length of the run-id prefix used in artifact directory names.
const RUN_ID_PREFIX: usize = 12;
/// Length of the dataset-hash prefix used in artifact directory names.
const DATASET_HASH_PREFIX: usize = 8;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version != SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (expected {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the per-bar ledger joined with its bars.
///
/// Columns: timestamp, session_date, close, rsi, cash, shares,
/// portfolio_value, signal, stoploss. `rsi` is empty while undefined and
/// `signal` uses the B/S codes.
pub fn export_ledger_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "session_date",
        "close",
        "rsi",
        "cash",
        "shares",
        "portfolio_value",
        "signal",
        "stoploss",
    ])?;

    for (bar, row) in result.bars.iter().zip(&result.ledger) {
        let timestamp = bar.timestamp.to_rfc3339();
        let session_date = bar.session_date.to_string();
        let close = format!("{:.4}", bar.close);
        let rsi = bar.rsi.map(|v| format!("{v:.4}")).unwrap_or_default();
        let cash = format!("{:.4}", row.cash);
        let shares = row.shares.to_string();
        let value = format!("{:.4}", row.portfolio_value);
        wtr.write_record([
            timestamp.as_str(),
            session_date.as_str(),
            close.as_str(),
            rsi.as_str(),
            cash.as_str(),
            shares.as_str(),
            value.as_str(),
            row.signal.code(),
            if row.stoploss_fired { "1" } else { "0" },
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the day-end summary with session_date, portfolio_value and close columns.
pub fn export_daily_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["session_date", "portfolio_value", "close"])?;
    for d in &result.daily {
        wtr.write_record([
            &d.session_date.to_string(),
            &format!("{:.2}", d.portfolio_value),
            &format!("{:.4}", d.close),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a run's artifacts:
/// `{symbol}_{run id prefix}_{dataset hash prefix}`.
///
/// The run id covers the configuration and the dataset hash covers the bars,
/// so the same parameters over different data land in different directories.
pub fn artifact_dir_name(result: &BacktestResult) -> String {
    let run: String = result.run_id.chars().take(RUN_ID_PREFIX).collect();
    let data: String = result.dataset_hash.chars().take(DATASET_HASH_PREFIX).collect();
    format!("{}_{}_{}", result.symbol, run, data)
}

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{run id prefix}_{dataset hash prefix}/` under `output_dir` containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `ledger.csv` — per-bar ledger
/// - `daily.csv` — day-end summary
/// - `report.md` — Markdown report
///
/// Re-running the same configuration on the same bars overwrites the same
/// directory.
/// Returns the path to the directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("ledger.csv", export_ledger_csv(result)?),
        ("daily.csv", export_daily_csv(result)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Two-decimal value, or `n/a` when undefined.
pub fn format_stat(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "n/a".to_string()
    }
}

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let b = &result.config.backtest;

    md.push_str("# RSI Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    if let (Some(first), Some(last)) = (result.daily.first(), result.daily.last()) {
        md.push_str(&format!(
            "| Period | {} to {} |\n",
            first.session_date, last.session_date
        ));
    }
    md.push_str(&format!(
        "| Session | {} to {} ({}) |\n",
        result.config.session.start, result.config.session.end, result.config.session.timezone
    ));
    md.push_str(&format!("| Bars | {} |\n", result.bars.len()));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Ledger Hash | {} |\n", result.ledger_hash));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push('\n');

    md.push_str("## Parameters\n\n");
    md.push_str("| Parameter | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Initial Capital | ${:.0} |\n", b.initial_capital));
    md.push_str(&format!(
        "| Trade Size | {:.2}% |\n",
        b.trade_fraction * 100.0
    ));
    md.push_str(&format!(
        "| Stoploss | {:.2}% |\n",
        b.stoploss_fraction * 100.0
    ));
    md.push_str(&format!(
        "| Kill Switch | {} |\n",
        if b.kill_switch { "on" } else { "off" }
    ));
    md.push('\n');

    let s = &result.stats;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Geometric Return | {}% |\n",
        format_stat(s.geometric_return)
    ));
    md.push_str(&format!(
        "| Mean Annual Return | {}% |\n",
        format_stat(s.mean_annual_return)
    ));
    md.push_str(&format!(
        "| Annual Volatility | {}% |\n",
        format_stat(s.annual_volatility)
    ));
    md.push_str(&format!("| Sharpe Ratio | {} |\n", format_stat(s.sharpe_ratio)));
    md.push_str(&format!("| Final Equity | ${} |\n", format_stat(s.final_equity)));
    md.push_str(&format!("| Trading Days | {} |\n", s.trading_days));
    md.push_str(&format!("| Buys | {} |\n", s.buy_count));
    md.push_str(&format!("| Sells | {} |\n", s.sell_count));
    md.push_str(&format!("| Stoplosses | {} |\n", s.stoploss_count));
    md.push('\n');

    md.push_str("## Daily Equity\n\n");
    md.push_str("| Date | Portfolio Value | Close |\n");
    md.push_str("| --- | ---: | ---: |\n");
    for d in &result.daily {
        md.push_str(&format!(
            "| {} | {:.2} | {:.2} |\n",
            d.session_date, d.portfolio_value, d.close
        ));
    }

    md
}
