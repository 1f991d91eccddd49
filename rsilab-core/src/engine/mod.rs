//! Simulation engine — the intraday RSI trading state machine.
//!
//! The engine consumes a session-filtered bar series, computes the RSI and
//! day windows once, then walks the bars in timestamp order applying the
//! per-bar transition:
//!
//! 1. Forced liquidation on the final bar of each day
//! 2. Kill-halt expiry at the first bar of a new session date
//! 3. Mark-to-market
//! 4. Stoploss / entry / exit rules
//! 5. Ledger row emission, baseline carry-forward, cooldown reset

pub mod config;
pub mod error;
pub mod loop_runner;
pub mod progress;
pub mod state;
pub mod transition;

pub use config::SimulationConfig;
pub use error::EngineError;
pub use loop_runner::{run_simulation, simulate, SignalCounts, SimulationRun};
pub use progress::{channel_progress, ProgressEvent, PROGRESS_EVERY};
pub use state::{PortfolioState, TradingPhase};
pub use transition::{shares_to_buy, step, BarContext};
