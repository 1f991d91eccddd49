//! Per-bar state transition — the simulation state machine.
//!
//! Rules are evaluated in a fixed order for every bar:
//! 1. Forced liquidation on the day's final bar (even while halted)
//! 2. Kill-halt expiry on the first bar of a later session date
//! 3. Mark-to-market
//! 4. Stoploss test, else entry (RSI below oversold), else exit (RSI above
//!    overbought); skipped on the final bar of the day
//! 5. Ledger row emission
//! 6. Stoploss baseline carry-forward
//! 7. Per-bar stoploss reset when the kill switch is disabled

use chrono::NaiveDate;

use super::config::SimulationConfig;
use super::state::PortfolioState;
use crate::domain::{LedgerRow, Signal};

/// Everything the transition needs to know about one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarContext {
    pub close: f64,
    /// RSI at this bar, `None` during warmup or when undefined.
    pub rsi: Option<f64>,
    pub session_date: NaiveDate,
    /// Whether this is the final bar of its trading day.
    pub is_last_bar: bool,
}

/// Apply one bar to `state`, returning the next state and the bar's ledger row.
///
/// Pure: the result depends only on the arguments.
pub fn step(
    mut state: PortfolioState,
    bar: &BarContext,
    config: &SimulationConfig,
) -> (PortfolioState, LedgerRow) {
    let price = bar.close;
    let mut signal = Signal::None;
    let mut stoploss_fired = false;

    if bar.is_last_bar && state.liquidate(price) > 0 {
        signal = Signal::Sell;
    }

    if let Some(halted_on) = state.kill_halt_date {
        if bar.session_date != halted_on {
            state.kill_halt_date = None;
            state.stoploss_active = false;
            state.prev_portfolio_value = state.equity(price);
        }
    }

    let portfolio_value = state.equity(price);

    // The final bar of the day accepts no new trades.
    if !bar.is_last_bar && !state.stoploss_active {
        if portfolio_value - state.prev_portfolio_value < -config.stoploss_limit() {
            state.stoploss_active = true;
            stoploss_fired = true;
            state.liquidate(price);
            if config.kill_switch_enabled {
                state.kill_halt_date = Some(bar.session_date);
            }
        } else if bar.rsi.is_some_and(|r| r < config.oversold) {
            let shares = shares_to_buy(config.trade_budget(), price);
            if state.buy(shares, price) {
                signal = Signal::Buy;
            }
        } else if bar.rsi.is_some_and(|r| r > config.overbought) && !state.is_flat() {
            state.liquidate(price);
            signal = Signal::Sell;
        }
    }

    let row = LedgerRow {
        cash: state.cash,
        shares: state.shares,
        portfolio_value: state.equity(price),
        signal,
        stoploss_fired,
    };

    state.prev_portfolio_value = row.portfolio_value;

    if !config.kill_switch_enabled {
        state.stoploss_active = false;
    }

    (state, row)
}

/// Whole shares affordable with `budget` at `price`; zero for unusable inputs.
pub fn shares_to_buy(budget: f64, price: f64) -> u64 {
    if !budget.is_finite() || budget <= 0.0 || !price.is_finite() || price <= 0.0 {
        return 0;
    }
    (budget / price).floor() as u64
}
