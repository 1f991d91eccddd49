//! Performance statistics over day-end equity.
//!
//! Every statistic is a pure function of the day-end portfolio values. Returns
//! are in percent, annualized with 252 trading days per year. A statistic that
//! is undefined for the input is `f64::NAN` (serialized as JSON `null`).

use serde::{Deserialize, Serialize};
use tracing::warn;

use rsilab_core::engine::SignalCounts;

use crate::summary::{equity_series, DailySummary};

/// Annualization constant.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Aggregate statistics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    #[serde(with = "nan_as_null")]
    pub geometric_return: f64,
    #[serde(with = "nan_as_null")]
    pub mean_annual_return: f64,
    #[serde(with = "nan_as_null")]
    pub annual_volatility: f64,
    #[serde(with = "nan_as_null")]
    pub sharpe_ratio: f64,
    pub trading_days: usize,
    #[serde(with = "nan_as_null")]
    pub final_equity: f64,
    pub buy_count: usize,
    pub sell_count: usize,
    pub stoploss_count: usize,
}

impl PerformanceStats {
    /// Compute all statistics from the daily summary and the run's trade tallies.
    pub fn compute(daily: &[DailySummary], counts: SignalCounts) -> Self {
        let equity = equity_series(daily);
        let stats = Self {
            geometric_return: geometric_return(&equity),
            mean_annual_return: mean_annual_return(&equity),
            annual_volatility: annual_volatility(&equity),
            sharpe_ratio: sharpe_ratio(&equity),
            trading_days: daily.len(),
            final_equity: equity.last().copied().unwrap_or(f64::NAN),
            buy_count: counts.buys,
            sell_count: counts.sells,
            stoploss_count: counts.stoplosses,
        };
        if stats.sharpe_ratio.is_nan() || stats.geometric_return.is_nan() {
            warn!(
                trading_days = stats.trading_days,
                "some statistics are undefined for this run"
            );
        }
        stats
    }
}

/// Non-finite values round-trip through JSON as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else {
            s.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

// ─── Individual statistics ──────────────────────────────────────────

/// Geometric annualized return in percent: `((V_last / V_first)^(252/N) - 1) * 100`
/// where N is the number of days.
///
/// NaN when there are no days or the first value is not positive.
pub fn geometric_return(equity: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (equity.first(), equity.last()) else {
        return f64::NAN;
    };
    if first <= 0.0 {
        return f64::NAN;
    }
    let exponent = TRADING_DAYS_PER_YEAR / equity.len() as f64;
    ((last / first).powf(exponent) - 1.0) * 100.0
}

/// Arithmetic mean of daily returns, annualized, in percent.
///
/// NaN with fewer than two days.
pub fn mean_annual_return(equity: &[f64]) -> f64 {
    let returns = daily_returns(equity);
    if returns.is_empty() {
        return f64::NAN;
    }
    mean_f64(&returns) * TRADING_DAYS_PER_YEAR * 100.0
}

/// Sample standard deviation of daily returns, annualized, in percent.
///
/// NaN with fewer than two daily returns. Exactly 0.0 when every daily
/// return is the same up to rounding.
pub fn annual_volatility(equity: &[f64]) -> f64 {
    match daily_std(&daily_returns(equity)) {
        Some(std) => std * TRADING_DAYS_PER_YEAR.sqrt() * 100.0,
        None => f64::NAN,
    }
}

/// Annualized mean return over annualized volatility.
///
/// NaN with fewer than two days or when volatility is zero or undefined.
pub fn sharpe_ratio(equity: &[f64]) -> f64 {
    if equity.len() < 2 {
        return f64::NAN;
    }
    let vol = annual_volatility(equity);
    if vol.is_nan() || vol == 0.0 {
        return f64::NAN;
    }
    mean_annual_return(equity) / vol
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Day-over-day fractional changes. A non-positive prior value yields 0.0.
pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

/// Raw daily standard deviation, snapped to 0.0 when it is rounding noise
/// relative to the mean return. `None` with fewer than two returns.
fn daily_std(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let std = std_dev(returns);
    let noise_floor = 1e-12 * mean_f64(returns).abs().max(1e-12);
    Some(if std <= noise_floor { 0.0 } else { std })
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1).
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
