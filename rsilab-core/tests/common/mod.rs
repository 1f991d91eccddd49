//! Shared helpers for core integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rsilab_core::domain::Bar;

pub fn session_date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// One-minute bars for a single session starting 09:30 New York (14:30 UTC).
pub fn day_bars(day: u32, closes: &[f64]) -> Vec<Bar> {
    let open = Utc.with_ymd_and_hms(2024, 1, day, 14, 30, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar::new(open + Duration::minutes(i as i64), session_date(day), close))
        .collect()
}

/// Fifteen closes oscillating by 0.1 so the RSI settles at 50 on bar 14.
pub fn flat_prefix() -> Vec<f64> {
    let mut closes = Vec::with_capacity(15);
    for _ in 0..7 {
        closes.push(100.0);
        closes.push(100.1);
    }
    closes.push(100.0);
    closes
}

pub fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
