//! RSI Lab Runner — backtest orchestration, ingestion, statistics, export.
//!
//! This crate builds on `rsilab-core` to provide:
//! - CSV and synthetic bar ingestion
//! - Session-window filtering in the venue timezone
//! - Single-backtest runner with daily summary and statistics
//! - JSON, CSV, and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod session_filter;
pub mod summary;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{load_csv, parse_csv, synthetic_minute_bars, LoadError, RawBar};
pub use export::{
    export_daily_csv, export_json, export_ledger_csv, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use metrics::PerformanceStats;
pub use runner::{
    run_backtest, run_backtest_cancellable, run_from_config, BacktestResult, BarRecord, RunError,
    SCHEMA_VERSION,
};
pub use session_filter::{apply_session, SessionWindow};
pub use summary::{daily_summary, DailySummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<SessionWindow>();
        assert_sync::<SessionWindow>();
    }

    #[test]
    fn performance_stats_is_send_sync() {
        assert_send::<PerformanceStats>();
        assert_sync::<PerformanceStats>();
    }
}
