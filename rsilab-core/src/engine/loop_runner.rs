//! Bar-by-bar simulation loop.
//!
//! Validates configuration and input, precomputes the RSI and day windows,
//! then folds [`step`] over the bars in timestamp order. Bars are never
//! reordered, batched or processed in parallel: each transition depends on
//! the equity carried forward from the previous one.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::SimulationConfig;
use super::error::EngineError;
use super::progress::{ProgressEvent, PROGRESS_EVERY};
use super::state::{PortfolioState, TradingPhase};
use super::transition::{step, BarContext};
use crate::domain::{Bar, LedgerRow, Signal};
use crate::indicators::{defined, Indicator, Rsi};
use crate::session::DayWindows;

/// Output of a completed simulation.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    /// RSI per bar (`None` during warmup or when undefined).
    pub rsi: Vec<Option<f64>>,
    /// Day windows of the input series.
    pub days: DayWindows,
    /// One row per input bar, in input order.
    pub ledger: Vec<LedgerRow>,
    /// State after the last bar.
    pub final_state: PortfolioState,
}

/// Trade event tallies over a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub buys: usize,
    pub sells: usize,
    pub stoplosses: usize,
}

impl SignalCounts {
    pub fn from_ledger(ledger: &[LedgerRow]) -> Self {
        ledger.iter().fold(Self::default(), |mut acc, row| {
            match row.signal {
                Signal::Buy => acc.buys += 1,
                Signal::Sell => acc.sells += 1,
                Signal::None => {}
            }
            if row.stoploss_fired {
                acc.stoplosses += 1;
            }
            acc
        })
    }
}

impl SimulationRun {
    pub fn final_equity(&self) -> f64 {
        self.ledger.last().map_or(0.0, |row| row.portfolio_value)
    }

    pub fn signal_counts(&self) -> SignalCounts {
        SignalCounts::from_ledger(&self.ledger)
    }
}

/// Run the simulation without progress reporting or cancellation.
pub fn simulate(bars: &[Bar], config: &SimulationConfig) -> Result<SimulationRun, EngineError> {
    run_simulation(bars, config, None, None)
}

/// Run the simulation over `bars`.
///
/// `progress` receives an event every [`PROGRESS_EVERY`] bars and once on
/// completion. If `cancel` is set between bars the run stops with
/// [`EngineError::Cancelled`] and the partial ledger is discarded.
pub fn run_simulation(
    bars: &[Bar],
    config: &SimulationConfig,
    progress: Option<&dyn Fn(&ProgressEvent)>,
    cancel: Option<&AtomicBool>,
) -> Result<SimulationRun, EngineError> {
    config.validate()?;
    if bars.is_empty() {
        return Err(EngineError::EmptyInputSeries);
    }
    let days = DayWindows::segment(bars)?;

    let rsi: Vec<Option<f64>> = Rsi::new(config.rsi_period)
        .compute(bars)
        .into_iter()
        .map(defined)
        .collect();

    let total = bars.len();
    info!(
        bars = total,
        days = days.len(),
        initial_capital = config.initial_capital,
        kill_switch = config.kill_switch_enabled,
        "starting simulation"
    );

    let mut state = PortfolioState::new(config.initial_capital);
    let mut ledger = Vec::with_capacity(total);

    for (i, bar) in bars.iter().enumerate() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(EngineError::Cancelled { processed: i });
        }
        if let Some(cb) = progress {
            if i % PROGRESS_EVERY == 0 {
                cb(&ProgressEvent {
                    processed: i,
                    total,
                });
            }
        }

        let ctx = BarContext {
            close: bar.close,
            rsi: rsi[i],
            session_date: bar.session_date,
            is_last_bar: days.is_last_bar(i),
        };
        let was_halted = state.phase() == TradingPhase::KillHalted;
        let (next, row) = step(state, &ctx, config);
        log_transition(bar, &row, was_halted, &next);

        state = next;
        ledger.push(row);
    }

    if let Some(cb) = progress {
        cb(&ProgressEvent {
            processed: total,
            total,
        });
    }

    let run = SimulationRun {
        rsi,
        days,
        ledger,
        final_state: state,
    };
    let counts = run.signal_counts();
    info!(
        final_equity = run.final_equity(),
        buys = counts.buys,
        sells = counts.sells,
        stoplosses = counts.stoplosses,
        "simulation complete"
    );
    Ok(run)
}

fn log_transition(bar: &Bar, row: &LedgerRow, was_halted: bool, next: &PortfolioState) {
    if row.stoploss_fired {
        debug!(timestamp = %bar.timestamp, close = bar.close, cash = row.cash, "stoploss fired");
    }
    match next.phase() {
        TradingPhase::KillHalted if !was_halted => {
            debug!(date = %bar.session_date, "kill switch halted trading for the day");
        }
        TradingPhase::Trading if was_halted => {
            debug!(date = %bar.session_date, "kill halt expired");
        }
        _ => {}
    }
    match row.signal {
        Signal::Buy => debug!(
            timestamp = %bar.timestamp,
            close = bar.close,
            shares = row.shares,
            "buy"
        ),
        Signal::Sell => debug!(
            timestamp = %bar.timestamp,
            close = bar.close,
            cash = row.cash,
            "sell"
        ),
        Signal::None => {}
    }
}
