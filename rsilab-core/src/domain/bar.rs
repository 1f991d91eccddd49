//! Bar — one close-price observation of the traded instrument.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One intraday bar, already localized and filtered to the trading session.
///
/// `timestamp` is the bar's instant; `session_date` is the calendar date in the
/// venue's local timezone, attached at ingestion. Bars are ordered strictly
/// ascending by `timestamp` within a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub session_date: NaiveDate,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, session_date: NaiveDate, close: f64) -> Self {
        Self {
            timestamp,
            session_date,
            close,
        }
    }

    /// A usable price is finite and strictly positive.
    pub fn is_sane(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
