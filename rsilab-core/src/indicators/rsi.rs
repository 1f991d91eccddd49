//! Relative Strength Index (RSI).
//!
//! Uses simple (not Wilder) moving averages of gains and losses over the
//! window. RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period. The first `period` bars of the whole series are NaN.
//! Edge cases: avg_loss == 0 with avg_gain > 0 → RSI = 100; a window with no
//! movement at all (avg_gain == avg_loss == 0) → NaN.

use super::sma::rolling_mean;
use super::Indicator;
use crate::domain::Bar;

/// Default RSI window.
pub const DEFAULT_RSI_PERIOD: usize = 14;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(DEFAULT_RSI_PERIOD)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n <= self.period {
            return result;
        }

        // Split price changes; bar 0 has no change and counts as zero movement.
        let mut gains = vec![0.0; n];
        let mut losses = vec![0.0; n];
        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            if change > 0.0 {
                gains[i] = change;
            } else if change < 0.0 {
                losses[i] = -change;
            }
        }

        let avg_gain = rolling_mean(&gains, self.period);
        let avg_loss = rolling_mean(&losses, self.period);

        for i in self.period..n {
            result[i] = compute_rsi(avg_gain[i], avg_loss[i]);
        }

        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            f64::NAN
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
