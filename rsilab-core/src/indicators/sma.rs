//! Simple moving average over an arbitrary value series.
//!
//! Requires a full window: the first `period - 1` outputs are NaN.

/// Rolling mean of `values` over `period` observations.
///
/// Each window is summed from scratch so that a window of exact zeros yields
/// exactly `0.0` (the RSI zero-loss test depends on it). A NaN anywhere in a
/// window makes that output NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "rolling mean period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        result[i] = window.iter().sum::<f64>() / period as f64;
    }

    result
}
