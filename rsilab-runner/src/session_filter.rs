//! Session-window filtering: localize raw bars to the venue timezone and keep
//! only those inside the intraday trading window.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use rsilab_core::domain::Bar;

use crate::config::ConfigError;
use crate::data_loader::RawBar;

/// Inclusive intraday window in a venue's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub timezone: Tz,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(timezone: Tz, start: NaiveTime, end: NaiveTime) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::EmptyWindow { start, end });
        }
        Ok(Self {
            timezone,
            start,
            end,
        })
    }

    /// Session date of `timestamp` if its local time falls inside the window.
    pub fn session_date(&self, timestamp: DateTime<Utc>) -> Option<NaiveDate> {
        let local = timestamp.with_timezone(&self.timezone);
        let time = local.time();
        (self.start <= time && time <= self.end).then(|| local.date_naive())
    }
}

impl Default for SessionWindow {
    /// US equities regular session, 09:30 to 16:00 New York time.
    fn default() -> Self {
        Self {
            timezone: chrono_tz::US::Eastern,
            start: NaiveTime::from_hms_opt(9, 30, 0).expect("constant time"),
            end: NaiveTime::from_hms_opt(16, 0, 0).expect("constant time"),
        }
    }
}

/// Keep the bars inside `window`, attaching each one's local session date.
///
/// Input order is preserved. Ordering problems are left for the engine to
/// report.
pub fn apply_session(raw: &[RawBar], window: &SessionWindow) -> Vec<Bar> {
    let bars: Vec<Bar> = raw
        .iter()
        .filter_map(|r| {
            window
                .session_date(r.timestamp)
                .map(|date| Bar::new(r.timestamp, date, r.close))
        })
        .collect();

    let dropped = raw.len() - bars.len();
    if dropped > 0 {
        warn!(
            dropped,
            kept = bars.len(),
            timezone = %window.timezone,
            "session filter dropped bars outside the trading window"
        );
    }
    bars
}
