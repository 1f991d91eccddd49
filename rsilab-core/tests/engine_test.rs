//! Integration tests for the simulation engine.
//!
//! Tests:
//! 1. Entry/exit scenario on a single day
//! 2. Stoploss with and without the kill switch
//! 3. Forced end-of-day liquidation and cross-day behavior
//! 4. Ledger invariants and determinism

mod common;

use common::{assert_approx, day_bars, flat_prefix, session_date};
use rsilab_core::domain::{Bar, Signal};
use rsilab_core::engine::{simulate, EngineError, SimulationConfig, TradingPhase};

fn config() -> SimulationConfig {
    SimulationConfig::new(100_000.0, 0.5, 0.01)
}

/// 20 bars: RSI 21.4 at bar 15, 50 at 16, 62.5 at 17, 71.4 at 18.
fn entry_exit_day() -> Vec<Bar> {
    let mut closes = flat_prefix();
    closes.extend([98.5, 100.0, 101.5, 103.0, 103.1]);
    day_bars(2, &closes)
}

/// 20 bars: buy at 15, a 2.5 drop on 507 shares at bar 16 breaches the 1,000 limit.
fn stoploss_day() -> Vec<Bar> {
    let mut closes = flat_prefix();
    closes.extend([98.5, 96.0, 95.9, 95.8, 95.9]);
    day_bars(2, &closes)
}

// ──────────────────────────────────────────────
// Entry / exit
// ──────────────────────────────────────────────

#[test]
fn rsi_warmup_spans_first_fourteen_bars() {
    let run = simulate(&entry_exit_day(), &config()).unwrap();
    assert!(run.rsi[..14].iter().all(Option::is_none));
    assert_approx(run.rsi[14].unwrap(), 50.0);
    assert!(run.rsi[15].unwrap() < 30.0);
    assert!(run.rsi[18].unwrap() > 70.0);
}

#[test]
fn buys_oversold_and_sells_overbought() {
    let run = simulate(&entry_exit_day(), &config()).unwrap();
    let signals: Vec<Signal> = run.ledger.iter().map(|r| r.signal).collect();

    for (i, s) in signals.iter().enumerate() {
        match i {
            15 => assert_eq!(*s, Signal::Buy, "bar {i}"),
            18 => assert_eq!(*s, Signal::Sell, "bar {i}"),
            _ => assert_eq!(*s, Signal::None, "bar {i}"),
        }
    }

    // floor(50_000 / 98.5) = 507 shares
    assert_eq!(run.ledger[15].shares, 507);
    assert_approx(run.ledger[15].cash, 50_060.5);
    assert_eq!(run.ledger[17].shares, 507);
    assert_eq!(run.ledger[18].shares, 0);
    assert_approx(run.ledger[18].cash, 102_281.5);

    // Already flat on the final bar: nothing left to liquidate.
    assert_eq!(run.ledger[19].shares, 0);
    assert_approx(run.ledger[19].portfolio_value, 102_281.5);
    assert!(run.ledger.iter().all(|r| !r.stoploss_fired));
}

#[test]
fn final_bar_liquidates_open_position() {
    let mut closes = flat_prefix();
    closes.extend([98.5, 99.0]);
    let run = simulate(&day_bars(2, &closes), &config()).unwrap();

    assert_eq!(run.ledger[15].signal, Signal::Buy);
    let last = run.ledger.last().unwrap();
    assert_eq!(last.signal, Signal::Sell);
    assert_eq!(last.shares, 0);
    // 50_060.5 + 507 * 99.0
    assert_approx(last.cash, 100_253.5);
}

// ──────────────────────────────────────────────
// Stoploss
// ──────────────────────────────────────────────

#[test]
fn stoploss_fires_and_cooldown_lasts_one_bar() {
    let run = simulate(&stoploss_day(), &config()).unwrap();

    let fired: Vec<usize> = run
        .ledger
        .iter()
        .enumerate()
        .filter(|(_, r)| r.stoploss_fired)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(fired, vec![16]);

    let row = &run.ledger[16];
    assert_eq!(row.shares, 0);
    assert_eq!(row.signal, Signal::None);
    // 50_060.5 + 507 * 96.0
    assert_approx(row.cash, 98_732.5);

    // Kill switch off: RSI is still oversold and the next bar buys again.
    assert_eq!(run.ledger[17].signal, Signal::Buy);
    assert_eq!(run.ledger[17].shares, 521);
    // Second buy would need 49_911.8 with only 48_768.6 left.
    assert_eq!(run.ledger[18].signal, Signal::None);
    assert_eq!(run.ledger[19].signal, Signal::Sell);
    assert_eq!(run.ledger[19].shares, 0);
    assert_eq!(run.final_state.phase(), TradingPhase::Trading);
}

#[test]
fn kill_switch_halts_rest_of_day_and_resumes_next_day() {
    let mut bars = stoploss_day();
    bars.extend(day_bars(3, &[95.0, 95.1]));
    let run = simulate(&bars, &config().with_kill_switch(true)).unwrap();

    assert!(run.ledger[16].stoploss_fired);
    for (i, row) in run.ledger.iter().enumerate().take(20).skip(17) {
        assert_eq!(row.signal, Signal::None, "bar {i} traded during kill halt");
        assert!(!row.stoploss_fired);
        assert_eq!(row.shares, 0);
    }

    // New session: halt cleared, baseline reset, oversold entry allowed.
    assert_eq!(run.ledger[20].signal, Signal::Buy);
    assert_eq!(run.ledger[20].shares, 526);
    assert_eq!(run.ledger[21].signal, Signal::Sell);
    assert_approx(run.ledger[21].cash, 98_785.1);
    assert_eq!(run.final_state.phase(), TradingPhase::Trading);
}

#[test]
fn kill_switch_on_final_day_leaves_engine_halted() {
    let run = simulate(&stoploss_day(), &config().with_kill_switch(true)).unwrap();
    assert_eq!(run.final_state.phase(), TradingPhase::KillHalted);
    assert_eq!(run.final_state.kill_halt_date, Some(session_date(2)));
    assert_eq!(run.ledger.last().unwrap().shares, 0);
}

// ──────────────────────────────────────────────
// Day boundaries
// ──────────────────────────────────────────────

#[test]
fn every_day_ends_flat() {
    let mut bars = Vec::new();
    let mut closes = flat_prefix();
    closes.extend([98.5, 99.0, 99.2]);
    bars.extend(day_bars(2, &closes));
    bars.extend(day_bars(3, &[97.0, 96.5, 96.8, 97.5]));
    bars.extend(day_bars(4, &[98.0]));
    let run = simulate(&bars, &config()).unwrap();

    assert_eq!(run.days.len(), 3);
    for window in run.days.windows() {
        assert_eq!(
            run.ledger[window.last].shares, 0,
            "open position at end of {}",
            window.session_date
        );
    }
}

#[test]
fn baseline_carries_across_days_without_kill_switch() {
    // Day 2 ends flat at 100_253.5; day 3 opens with a buy and the stoploss
    // baseline is the prior day's closing equity.
    let mut closes = flat_prefix();
    closes.extend([98.5, 99.0]);
    let mut bars = day_bars(2, &closes);
    bars.extend(day_bars(3, &[97.0, 97.1]));
    let run = simulate(&bars, &config()).unwrap();

    assert_eq!(run.ledger[16].signal, Signal::Sell);
    assert_eq!(run.ledger[17].signal, Signal::Buy);
    assert!(!run.ledger[17].stoploss_fired);
}

// ──────────────────────────────────────────────
// Invariants and errors
// ──────────────────────────────────────────────

#[test]
fn ledger_invariants_hold_row_by_row() {
    let mut bars = stoploss_day();
    bars.extend(day_bars(3, &[95.0, 94.0, 96.0, 99.0, 101.0]));
    for kill in [false, true] {
        let run = simulate(&bars, &config().with_kill_switch(kill)).unwrap();
        for (row, bar) in run.ledger.iter().zip(&bars) {
            assert_eq!(row.portfolio_value, row.cash + row.shares as f64 * bar.close);
            assert!(row.cash >= 0.0);
        }
    }
}

#[test]
fn identical_runs_produce_identical_ledgers() {
    let bars = stoploss_day();
    let a = simulate(&bars, &config()).unwrap();
    let b = simulate(&bars, &config()).unwrap();
    assert_eq!(a.ledger, b.ledger);
    assert_eq!(a.final_state, b.final_state);
}

#[test]
fn non_monotonic_input_is_rejected() {
    let mut bars = entry_exit_day();
    bars.swap(3, 4);
    let err = simulate(&bars, &config()).unwrap_err();
    assert!(matches!(err, EngineError::NonMonotonicTimestamps { index: 4, .. }));
}

#[test]
fn invalid_configuration_is_rejected() {
    let bars = entry_exit_day();
    let bad = SimulationConfig::new(100_000.0, 1.5, 0.01);
    assert!(matches!(
        simulate(&bars, &bad),
        Err(EngineError::InvalidConfiguration(_))
    ));
}
