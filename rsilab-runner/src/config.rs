//! TOML backtest configuration.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rsilab_core::engine::SimulationConfig;

use crate::session_filter::SessionWindow;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or interpreting a [`BacktestConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid session {field} time '{value}' (expected HH:MM or HH:MM:SS)")]
    InvalidTime { field: &'static str, value: String },

    #[error("session window start {start} is after end {end}")]
    EmptyWindow { start: NaiveTime, end: NaiveTime },
}

/// Full configuration for one backtest run.
///
/// ```toml
/// [backtest]
/// symbol = "SPY"
/// initial_capital = 1000000.0
/// trade_fraction = 0.25
/// stoploss_fraction = 0.005
/// kill_switch = false
///
/// [session]
/// timezone = "US/Eastern"
/// start = "09:30:00"
/// end = "16:00:00"
///
/// [data]
/// path = "data/SPY.csv"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub data: Option<DataSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestSection {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    #[serde(default = "default_trade_fraction")]
    pub trade_fraction: f64,
    #[serde(default = "default_stoploss_fraction")]
    pub stoploss_fraction: f64,
    #[serde(default)]
    pub kill_switch: bool,
}

/// Intraday trading window, in the venue's local time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSection {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_session_start")]
    pub start: String,
    #[serde(default = "default_session_end")]
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    pub path: PathBuf,
}

fn default_symbol() -> String {
    "SPY".into()
}
fn default_initial_capital() -> f64 {
    SimulationConfig::default().initial_capital
}
fn default_trade_fraction() -> f64 {
    SimulationConfig::default().trade_fraction
}
fn default_stoploss_fraction() -> f64 {
    SimulationConfig::default().stoploss_fraction
}
fn default_timezone() -> String {
    "US/Eastern".into()
}
fn default_session_start() -> String {
    "09:30:00".into()
}
fn default_session_end() -> String {
    "16:00:00".into()
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            initial_capital: default_initial_capital(),
            trade_fraction: default_trade_fraction(),
            stoploss_fraction: default_stoploss_fraction(),
            kill_switch: false,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            start: default_session_start(),
            end: default_session_end(),
        }
    }
}

impl BacktestConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Engine parameters. Range checks happen in the engine.
    pub fn to_simulation_config(&self) -> SimulationConfig {
        SimulationConfig::new(
            self.backtest.initial_capital,
            self.backtest.trade_fraction,
            self.backtest.stoploss_fraction,
        )
        .with_kill_switch(self.backtest.kill_switch)
    }

    /// Parse the `[session]` section into a usable window.
    pub fn session_window(&self) -> Result<SessionWindow, ConfigError> {
        let tz: Tz = self
            .session
            .timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(self.session.timezone.clone()))?;
        let start = parse_time("start", &self.session.start)?;
        let end = parse_time("end", &self.session.end)?;
        SessionWindow::new(tz, start, end)
    }

    /// Data file path, if the config names one.
    pub fn data_path(&self) -> Option<&Path> {
        self.data.as_ref().map(|d| d.path.as_path())
    }

    /// Deterministic BLAKE3 identifier over every field that affects results.
    ///
    /// The data path is excluded: the same bars loaded from a different
    /// location produce the same run.
    pub fn run_id(&self) -> RunId {
        let mut hasher = blake3::Hasher::new();
        let b = &self.backtest;
        hasher.update(b.symbol.as_bytes());
        hasher.update(&b.initial_capital.to_le_bytes());
        hasher.update(&b.trade_fraction.to_le_bytes());
        hasher.update(&b.stoploss_fraction.to_le_bytes());
        hasher.update(&[u8::from(b.kill_switch)]);
        let s = &self.session;
        for field in [&s.timezone, &s.start, &s.end] {
            hasher.update(field.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ConfigError::InvalidTime {
            field,
            value: value.to_string(),
        })
}
