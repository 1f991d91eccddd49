//! Day-end snapshots of the ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rsilab_core::domain::{Bar, LedgerRow};

/// Last ledger row of one session date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub session_date: NaiveDate,
    pub portfolio_value: f64,
    /// Close of the day's last bar.
    pub close: f64,
}

/// One summary per session date, in input order.
///
/// `bars` and `ledger` are parallel slices; extra elements of the longer one
/// are ignored.
pub fn daily_summary(bars: &[Bar], ledger: &[LedgerRow]) -> Vec<DailySummary> {
    let mut out: Vec<DailySummary> = Vec::new();
    for (bar, row) in bars.iter().zip(ledger) {
        let snapshot = DailySummary {
            session_date: bar.session_date,
            portfolio_value: row.portfolio_value,
            close: bar.close,
        };
        match out.last_mut() {
            Some(last) if last.session_date == bar.session_date => *last = snapshot,
            _ => out.push(snapshot),
        }
    }
    out
}

/// Day-end portfolio values.
pub fn equity_series(daily: &[DailySummary]) -> Vec<f64> {
    daily.iter().map(|d| d.portfolio_value).collect()
}
