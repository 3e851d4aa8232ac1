//! TOML backtest configuration.
//!
//! A config file has six sections, all optional:
//!
//! ```toml
//! [backtest]
//! symbols = ["BTC/USD", "ETH/USD"]
//! start = "2024-01-01T00:00:00Z"
//! months_back = 6
//! candle_minutes = 240
//!
//! [data]
//! candles_dir = "data"
//! scores_file = "data/fear_greed.csv"
//!
//! [indicators]
//! rsi_period = 14
//!
//! [signal]
//! rsi_entry_threshold = 70.0
//!
//! [simulation]
//! initial_capital = 10000.0
//!
//! [output]
//! dir = "results"
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trendband_core::config::{
    ConfigError, IndicatorConfig, SignalConfig, SimulationConfig, StrategyConfig,
};
use trendband_core::data::DateRange;

/// Unique identifier for a backtest configuration (content hash).
pub type RunId = String;

/// Errors from reading a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ConfigError),
}

/// What to test and over which window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbols: Vec<String>,
    /// Inclusive bounds, RFC 3339.
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Keep only roughly the last N months (30-day months) of candles.
    pub months_back: Option<u32>,
    /// Keep only the last N candles. Applied after `months_back`.
    pub max_candles: Option<usize>,
    /// Candle length. Used for `months_back`, resampling and synthetic data.
    pub candle_minutes: u32,
    /// Aggregate the input into `candle_minutes` buckets before running.
    pub resample: bool,
    /// Drop the last candle, which on a live export is still forming.
    pub exclude_forming_candle: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC/USD".to_string()],
            start: None,
            end: None,
            months_back: None,
            max_candles: None,
            candle_minutes: 240,
            resample: false,
            exclude_forming_candle: false,
        }
    }
}

impl BacktestSection {
    pub fn date_range(&self) -> Result<DateRange, ConfigError> {
        DateRange::new(self.start, self.end)
    }

    /// Candle-count window implied by `months_back` and `max_candles`.
    pub fn window_len(&self) -> Option<usize> {
        let per_day = (24 * 60 / self.candle_minutes.max(1)).max(1) as usize;
        let from_months = self.months_back.map(|m| m as usize * 30 * per_day);
        match (from_months, self.max_candles) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Where candles and scores come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Directory holding one `{symbol}.csv` per symbol (`/` becomes `-`).
    pub candles_dir: PathBuf,
    /// Optional `timestamp,score` CSV applied to every symbol.
    pub scores_file: Option<PathBuf>,
    /// Generate synthetic candles instead of reading files.
    pub synthetic: bool,
    pub synthetic_count: usize,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            candles_dir: PathBuf::from("data"),
            scores_file: None,
            synthetic: false,
            synthetic_count: 1_000,
        }
    }
}

/// Artifact output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
    /// Also write the per-candle indicator dump.
    pub write_indicators: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            write_indicators: false,
        }
    }
}

/// A full backtest description, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub data: DataSection,
    pub indicators: IndicatorConfig,
    pub signal: SignalConfig,
    pub simulation: SimulationConfig,
    pub output: OutputSection,
}

impl BacktestConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML (used by `--dry-run` to echo the effective config).
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// The part of the config the simulator sees.
    pub fn strategy(&self) -> StrategyConfig {
        StrategyConfig {
            indicators: self.indicators.clone(),
            signal: self.signal.clone(),
            simulation: self.simulation.clone(),
        }
    }

    /// Surface the first configuration problem, if any.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        self.backtest.date_range()?;
        if self.backtest.candle_minutes == 0 {
            return Err(ConfigError::NonPositivePeriod {
                name: "candle_minutes",
                value: 0,
            });
        }
        self.strategy().validate()
    }

    /// Deterministic hash over everything that affects results.
    ///
    /// Two runs with identical inputs share a RunId. Output settings are
    /// excluded.
    pub fn run_id(&self) -> RunId {
        let canonical = format!(
            "{:?}|{:?}|{:?}",
            self.backtest,
            self.data,
            self.strategy()
        );
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}
