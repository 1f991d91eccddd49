//! Ledger rows — the per-bar output of the simulation engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade tag emitted while evaluating a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    #[default]
    None,
    Buy,
    Sell,
}

impl Signal {
    /// Single-letter code used in CSV exports ("", "B", "S").
    pub fn code(self) -> &'static str {
        match self {
            Signal::None => "",
            Signal::Buy => "B",
            Signal::Sell => "S",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::None => "none",
            Signal::Buy => "buy",
            Signal::Sell => "sell",
        };
        f.write_str(s)
    }
}

/// Portfolio snapshot after a bar has been evaluated.
///
/// Append-only: a row is never revised once the engine has emitted it.
/// `portfolio_value == cash + shares * close` for the bar it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub cash: f64,
    pub shares: u64,
    pub portfolio_value: f64,
    pub signal: Signal,
    pub stoploss_fired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_codes() {
        assert_eq!(Signal::None.code(), "");
        assert_eq!(Signal::Buy.code(), "B");
        assert_eq!(Signal::Sell.code(), "S");
        assert_eq!(Signal::default(), Signal::None);
    }

    #[test]
    fn signal_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Signal::Buy).unwrap(), "\"buy\"");
        let s: Signal = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(s, Signal::Sell);
    }
}
