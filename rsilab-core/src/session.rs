//! Session segmentation — partitions a bar series into trading days.
//!
//! Day boundaries are computed once, up front, so the engine can ask "is this
//! the final bar of its day?" with an index lookup instead of rescanning.
//! Segmentation also validates the ordering contract of the input series.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::engine::EngineError;

/// Contiguous run of bars sharing one `session_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub session_date: NaiveDate,
    /// Index of the day's first bar in the series.
    pub first: usize,
    /// Index of the day's last bar (the forced-liquidation bar).
    pub last: usize,
    /// Timestamp of the day's last bar.
    pub last_minute: DateTime<Utc>,
}

/// Day windows of a series plus a per-bar day lookup.
#[derive(Debug, Clone, Default)]
pub struct DayWindows {
    windows: Vec<DayWindow>,
    day_of_bar: Vec<usize>,
}

impl DayWindows {
    /// Segment `bars` into day windows.
    ///
    /// Fails if timestamps are not strictly ascending, if a session date goes
    /// backwards, or if a close price is unusable. An empty series yields no
    /// windows.
    pub fn segment(bars: &[Bar]) -> Result<Self, EngineError> {
        let mut windows: Vec<DayWindow> = Vec::new();
        let mut day_of_bar = Vec::with_capacity(bars.len());

        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(EngineError::InvalidPrice {
                    index: i,
                    close: bar.close,
                });
            }

            match windows.last_mut() {
                Some(current) => {
                    let previous = &bars[i - 1];
                    if bar.timestamp <= previous.timestamp {
                        return Err(EngineError::NonMonotonicTimestamps {
                            index: i,
                            previous: previous.timestamp,
                            current: bar.timestamp,
                        });
                    }
                    if bar.session_date < current.session_date {
                        return Err(EngineError::SessionDateRegression {
                            index: i,
                            previous: current.session_date,
                            current: bar.session_date,
                        });
                    }
                    if bar.session_date == current.session_date {
                        current.last = i;
                        current.last_minute = bar.timestamp;
                    } else {
                        windows.push(DayWindow {
                            session_date: bar.session_date,
                            first: i,
                            last: i,
                            last_minute: bar.timestamp,
                        });
                    }
                }
                None => windows.push(DayWindow {
                    session_date: bar.session_date,
                    first: i,
                    last: i,
                    last_minute: bar.timestamp,
                }),
            }

            day_of_bar.push(windows.len() - 1);
        }

        Ok(Self {
            windows,
            day_of_bar,
        })
    }

    pub fn windows(&self) -> &[DayWindow] {
        &self.windows
    }

    /// Number of trading days.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Day window containing bar `index`.
    pub fn window_of(&self, index: usize) -> Option<&DayWindow> {
        self.day_of_bar.get(index).map(|&d| &self.windows[d])
    }

    /// `last_minute` of the day containing bar `index`.
    pub fn last_minute(&self, index: usize) -> Option<DateTime<Utc>> {
        self.window_of(index).map(|w| w.last_minute)
    }

    /// Whether bar `index` is the final bar of its trading day.
    pub fn is_last_bar(&self, index: usize) -> bool {
        self.window_of(index).is_some_and(|w| w.last == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(day: u32, minute: i64, close: f64) -> Bar {
        let open = Utc.with_ymd_and_hms(2024, 1, day, 14, 30, 0).unwrap();
        Bar::new(
            open + Duration::minutes(minute),
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
        )
    }

    #[test]
    fn segments_two_days() {
        let bars = vec![
            bar(2, 0, 100.0),
            bar(2, 1, 101.0),
            bar(2, 2, 102.0),
            bar(3, 0, 103.0),
            bar(3, 1, 104.0),
        ];
        let days = DayWindows::segment(&bars).unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days.windows()[0].first, 0);
        assert_eq!(days.windows()[0].last, 2);
        assert_eq!(days.windows()[1].first, 3);
        assert_eq!(days.windows()[1].last, 4);
        assert!(days.window_of(5).is_none());

        let last_flags: Vec<bool> = (0..5).map(|i| days.is_last_bar(i)).collect();
        assert_eq!(last_flags, vec![false, false, true, false, true]);
        assert_eq!(days.last_minute(0), Some(bars[2].timestamp));
        assert_eq!(days.last_minute(3), Some(bars[4].timestamp));
    }

    #[test]
    fn single_bar_day_is_first_and_last() {
        let bars = vec![bar(2, 0, 100.0), bar(3, 0, 101.0), bar(3, 1, 102.0)];
        let days = DayWindows::segment(&bars).unwrap();
        let w = &days.windows()[0];
        assert_eq!(w.first, 0);
        assert_eq!(w.last, 0);
        assert!(days.is_last_bar(0));
    }

    #[test]
    fn empty_series_has_no_windows() {
        let days = DayWindows::segment(&[]).unwrap();
        assert!(days.is_empty());
        assert!(!days.is_last_bar(0));
        assert_eq!(days.last_minute(0), None);
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let bars = vec![bar(2, 0, 100.0), bar(2, 0, 101.0)];
        let err = DayWindows::segment(&bars).unwrap_err();
        assert!(matches!(
            err,
            EngineError::NonMonotonicTimestamps { index: 1, .. }
        ));
    }

    #[test]
    fn rejects_backwards_timestamp() {
        let bars = vec![bar(2, 5, 100.0), bar(2, 1, 101.0)];
        assert!(matches!(
            DayWindows::segment(&bars),
            Err(EngineError::NonMonotonicTimestamps { .. })
        ));
    }

    #[test]
    fn rejects_session_date_regression() {
        let mut late = bar(3, 0, 101.0);
        late.session_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = vec![bar(2, 0, 100.0), late];
        assert!(matches!(
            DayWindows::segment(&bars),
            Err(EngineError::SessionDateRegression { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_non_positive_close() {
        let bars = vec![bar(2, 0, 100.0), bar(2, 1, 0.0)];
        assert!(matches!(
            DayWindows::segment(&bars),
            Err(EngineError::InvalidPrice { index: 1, .. })
        ));
    }
}
