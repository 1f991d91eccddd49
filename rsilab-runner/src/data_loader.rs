//! Bar ingestion for the runner.
//!
//! Two sources:
//! 1. CSV files with epoch-millisecond timestamps in column `t` and closes in
//!    column `c` (other columns are ignored)
//! 2. Deterministic synthetic minute bars for development and tests
//!
//! Both produce [`RawBar`]s in UTC; session filtering happens afterwards.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Timestamp column name.
pub const TIMESTAMP_COLUMN: &str = "t";
/// Close price column name.
pub const CLOSE_COLUMN: &str = "c";
/// One-minute bars from 09:30 through 16:00 inclusive.
pub const MINUTES_PER_SESSION: usize = 391;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot parse {column} value '{value}'")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: close must be a positive finite price, got {close}")]
    InvalidClose { row: usize, close: f64 },

    #[error("row {row}: timestamp {millis} ms is out of range")]
    TimestampOutOfRange { row: usize, millis: i64 },
}

/// A bar as read from the source, before session filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Load raw bars from a CSV file.
pub fn load_csv(path: &Path) -> Result<Vec<RawBar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = parse_csv(file)?;
    info!(path = %path.display(), rows = bars.len(), "loaded bars");
    Ok(bars)
}

/// Parse raw bars from CSV text with a header row.
///
/// Row numbers in errors are 1-based data rows (the header is not counted).
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawBar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(LoadError::MissingColumn(name))
    };
    let t_idx = column(TIMESTAMP_COLUMN)?;
    let c_idx = column(CLOSE_COLUMN)?;

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let t_raw = record.get(t_idx).unwrap_or_default();
        let c_raw = record.get(c_idx).unwrap_or_default();

        let millis = parse_millis(t_raw).ok_or_else(|| LoadError::InvalidField {
            row,
            column: TIMESTAMP_COLUMN,
            value: t_raw.to_string(),
        })?;
        let timestamp = DateTime::from_timestamp_millis(millis)
            .ok_or(LoadError::TimestampOutOfRange { row, millis })?;

        let close: f64 = c_raw.parse().map_err(|_| LoadError::InvalidField {
            row,
            column: CLOSE_COLUMN,
            value: c_raw.to_string(),
        })?;
        if !close.is_finite() || close <= 0.0 {
            return Err(LoadError::InvalidClose { row, close });
        }

        bars.push(RawBar { timestamp, close });
    }
    debug!(rows = bars.len(), "parsed CSV bars");
    Ok(bars)
}

/// Integer milliseconds, also accepting float notation such as `1.7e12`.
fn parse_millis(s: &str) -> Option<i64> {
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    let f: f64 = s.parse().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Generate `days` weekdays of one-minute bars starting at `start`.
///
/// Each session covers 09:30 to 16:00 New York time. Prices follow a seeded
/// random walk from 100.0, so equal seeds give equal series.
pub fn synthetic_minute_bars(days: usize, seed: u64, start: NaiveDate) -> Vec<RawBar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let open = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default();
    let tz = chrono_tz::US::Eastern;

    let mut bars = Vec::with_capacity(days * MINUTES_PER_SESSION);
    let mut price = 100.0_f64;
    let mut date = start;
    let mut produced = 0;

    while produced < days {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
            continue;
        }
        let Some(session_open) = tz.from_local_datetime(&date.and_time(open)).earliest() else {
            date += Duration::days(1);
            continue;
        };
        let session_open = session_open.with_timezone(&Utc);
        for minute in 0..MINUTES_PER_SESSION {
            let step: f64 = rng.gen_range(-0.001..0.001);
            price = (price * (1.0 + step) * 100.0).round() / 100.0;
            bars.push(RawBar {
                timestamp: session_open + Duration::minutes(minute as i64),
                close: price.max(0.01),
            });
        }
        produced += 1;
        date += Duration::days(1);
    }

    debug!(days, seed, bars = bars.len(), "generated synthetic bars");
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_columns_and_ignores_extras() {
        let text = "\
t,o,h,l,c,v
1704205800000,100.0,100.5,99.5,100.25,1200
1704205860000,100.25,100.6,100.0,100.5,900
";
        let bars = parse_csv(text.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(
            bars[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()
        );
        assert_eq!(bars[1].close, 100.5);
    }

    #[test]
    fn column_order_does_not_matter() {
        let text = "c,t\n101.0,1704205800000\n";
        let bars = parse_csv(text.as_bytes()).unwrap();
        assert_eq!(bars[0].close, 101.0);
    }

    #[test]
    fn float_millis_accepted() {
        let bars = parse_csv("t,c\n1.7042058e12,100\n".as_bytes()).unwrap();
        assert_eq!(bars[0].timestamp.timestamp_millis(), 1_704_205_800_000);
    }

    #[test]
    fn missing_close_column_is_rejected() {
        let err = parse_csv("t,o\n1704205800000,100\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("c")));
    }

    #[test]
    fn unparseable_value_reports_row() {
        let text = "t,c\n1704205800000,100\n1704205860000,abc\n";
        let err = parse_csv(text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidField { row: 2, column: "c", .. }
        ));
    }

    #[test]
    fn non_positive_close_is_rejected() {
        let err = parse_csv("t,c\n1704205800000,0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidClose { row: 1, .. }));
    }

    #[test]
    fn header_only_yields_no_bars() {
        assert!(parse_csv("t,c\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_csv(Path::new("/nonexistent/rsilab/bars.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn synthetic_skips_weekends_and_is_deterministic() {
        // 2024-01-05 is a Friday; the next session is Monday 2024-01-08.
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let a = synthetic_minute_bars(2, 7, start);
        let b = synthetic_minute_bars(2, 7, start);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2 * MINUTES_PER_SESSION);
        assert_eq!(
            a[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap()
        );
        assert_eq!(
            a[MINUTES_PER_SESSION].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 8, 14, 30, 0).unwrap()
        );
        assert!(a.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(a.iter().all(|bar| bar.close > 0.0));
    }

    #[test]
    fn synthetic_seed_changes_path() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_ne!(
            synthetic_minute_bars(1, 1, start),
            synthetic_minute_bars(1, 2, start)
        );
    }
}
