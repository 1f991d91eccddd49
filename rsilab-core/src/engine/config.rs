//! Simulation configuration.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use crate::indicators::rsi::DEFAULT_RSI_PERIOD;

/// RSI level below which the strategy buys.
pub const DEFAULT_OVERSOLD: f64 = 30.0;
/// RSI level above which the strategy sells.
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

/// Configuration for a single simulation run, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Starting cash.
    pub initial_capital: f64,
    /// Fraction of `initial_capital` committed per buy, in [0, 1].
    pub trade_fraction: f64,
    /// Fraction of `initial_capital` defining the absolute bar-over-bar
    /// drawdown that fires the stoploss, in (0, 1].
    pub stoploss_fraction: f64,
    /// Escalate a stoploss into a halt for the rest of the calendar day.
    pub kill_switch_enabled: bool,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_oversold")]
    pub oversold: f64,
    #[serde(default = "default_overbought")]
    pub overbought: f64,
}

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

fn default_oversold() -> f64 {
    DEFAULT_OVERSOLD
}

fn default_overbought() -> f64 {
    DEFAULT_OVERBOUGHT
}

impl SimulationConfig {
    pub fn new(initial_capital: f64, trade_fraction: f64, stoploss_fraction: f64) -> Self {
        Self {
            initial_capital,
            trade_fraction,
            stoploss_fraction,
            kill_switch_enabled: false,
            rsi_period: DEFAULT_RSI_PERIOD,
            oversold: DEFAULT_OVERSOLD,
            overbought: DEFAULT_OVERBOUGHT,
        }
    }

    pub fn with_kill_switch(mut self, enabled: bool) -> Self {
        self.kill_switch_enabled = enabled;
        self
    }

    /// Cash committed to each buy: `initial_capital * trade_fraction`.
    pub fn trade_budget(&self) -> f64 {
        self.initial_capital * self.trade_fraction
    }

    /// Absolute drawdown that fires the stoploss: `initial_capital * stoploss_fraction`.
    pub fn stoploss_limit(&self) -> f64 {
        self.initial_capital * self.stoploss_fraction
    }

    /// Check all parameters before a run starts.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "initial_capital must be finite and > 0, got {}",
                self.initial_capital
            )));
        }
        if !(0.0..=1.0).contains(&self.trade_fraction) {
            return Err(EngineError::InvalidConfiguration(format!(
                "trade_fraction must be in [0, 1], got {}",
                self.trade_fraction
            )));
        }
        if self.stoploss_fraction.is_nan()
            || self.stoploss_fraction <= 0.0
            || self.stoploss_fraction > 1.0
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "stoploss_fraction must be in (0, 1], got {}",
                self.stoploss_fraction
            )));
        }
        if self.rsi_period == 0 {
            return Err(EngineError::InvalidConfiguration(
                "rsi_period must be >= 1".into(),
            ));
        }
        if self.oversold.is_nan() || self.overbought.is_nan() || self.oversold >= self.overbought {
            return Err(EngineError::InvalidConfiguration(format!(
                "oversold ({}) must be below overbought ({})",
                self.oversold, self.overbought
            )));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    /// Capital 1,000,000, 25% per trade, 0.5% stoploss, kill switch off.
    fn default() -> Self {
        Self::new(1_000_000.0, 0.25, 0.005)
    }
}
