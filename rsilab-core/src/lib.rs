//! RsiLab Core — bar types, RSI indicator, session segmentation, simulation engine.
//!
//! This crate contains the heart of the intraday backtester:
//! - Domain types (bars, ledger rows, trade signals)
//! - RSI indicator over the session-filtered close series
//! - Session segmenter (day windows, forced-liquidation bar lookup)
//! - Simulation engine: explicit portfolio state threaded through a pure
//!   per-bar transition with stoploss, kill switch and end-of-day liquidation

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod session;
