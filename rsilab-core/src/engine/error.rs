//! Engine error types.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Errors that stop a simulation before (or instead of) producing a ledger.
///
/// Undefined statistics are not errors; they surface as NaN in the metrics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("input bar series is empty")]
    EmptyInputSeries,

    #[error("timestamps not strictly ascending at bar {index}: {previous} then {current}")]
    NonMonotonicTimestamps {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("session date {current} at bar {index} precedes earlier session date {previous}")]
    SessionDateRegression {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("invalid close price {close} at bar {index} (must be finite and > 0)")]
    InvalidPrice { index: usize, close: f64 },

    #[error("simulation cancelled after {processed} bars")]
    Cancelled { processed: usize },
}
