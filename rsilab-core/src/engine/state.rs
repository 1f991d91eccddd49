//! Portfolio state carried from bar to bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Mutable state threaded through the simulation, one value per bar boundary.
///
/// Cash and shares only change through [`PortfolioState::buy`] and
/// [`PortfolioState::liquidate`], both of which move exactly
/// `shares * price` between the two, so `cash + shares * price` is conserved
/// at the trade price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub shares: u64,
    /// Suppresses new stoploss tests, entries and exits while set.
    pub stoploss_active: bool,
    /// Session date on which the kill switch halted trading.
    pub kill_halt_date: Option<NaiveDate>,
    /// Equity the next bar's stoploss test is measured against.
    pub prev_portfolio_value: f64,
}

/// Coarse view of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingPhase {
    Trading,
    StoplossCooldown,
    KillHalted,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            shares: 0,
            stoploss_active: false,
            kill_halt_date: None,
            prev_portfolio_value: initial_capital,
        }
    }

    /// Mark-to-market equity at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.shares as f64 * price
    }

    pub fn is_flat(&self) -> bool {
        self.shares == 0
    }

    pub fn phase(&self) -> TradingPhase {
        if self.kill_halt_date.is_some() {
            TradingPhase::KillHalted
        } else if self.stoploss_active {
            TradingPhase::StoplossCooldown
        } else {
            TradingPhase::Trading
        }
    }

    /// Buy `shares` at `price` if cash covers the cost. Returns whether the
    /// purchase happened.
    pub fn buy(&mut self, shares: u64, price: f64) -> bool {
        let cost = shares as f64 * price;
        if shares == 0 || self.cash < cost {
            return false;
        }
        self.cash -= cost;
        self.shares += shares;
        true
    }

    /// Sell every held share at `price`. Returns the number of shares sold.
    pub fn liquidate(&mut self, price: f64) -> u64 {
        let sold = self.shares;
        if sold > 0 {
            self.cash += sold as f64 * price;
            self.shares = 0;
        }
        sold
    }
}
