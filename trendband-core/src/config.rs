//! Strategy parameters for the indicator engine, signal machine and simulator.
//!
//! Every section deserializes with defaults, so a partial TOML table is
//! enough. `validate()` must pass before a run starts: a bad parameter is the
//! only fatal error class in the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal configuration problems, surfaced before any simulation step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be > 0 (got {value})")]
    NonPositivePeriod { name: &'static str, value: usize },

    #[error("band_multiplier must be finite and > 0 (got {0})")]
    InvalidMultiplier(f64),

    #[error("fee_rate must be in [0, 1) (got {0})")]
    InvalidFeeRate(f64),

    #[error("initial_capital must be finite and > 0 (got {0})")]
    InvalidCapital(f64),

    #[error("{name} must be finite and >= 0 (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("no symbols configured")]
    NoSymbols,
}

/// ATR windowing policy.
///
/// Changes when the trend band first becomes defined, and therefore when
/// the first tradable signal can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrWindow {
    /// Undefined until `atr_period` true-range samples exist.
    #[default]
    Strict,
    /// Shrinking window from the first candle.
    Immediate,
}

/// Averaging used for RSI gains and losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSmoothing {
    /// Rolling mean over the last `rsi_period` deltas.
    #[default]
    Simple,
    /// Simple-mean seed, then Wilder smoothing (alpha = 1/period).
    Wilder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub atr_period: usize,
    pub band_multiplier: f64,
    pub atr_window: AtrWindow,
    pub rsi_smoothing: RsiSmoothing,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            atr_period: 14,
            band_multiplier: 1.6,
            atr_window: AtrWindow::Strict,
            rsi_smoothing: RsiSmoothing::Simple,
        }
    }
}

impl IndicatorConfig {
    /// Minimum history before a signal can be produced.
    pub fn warmup(&self) -> usize {
        self.rsi_period.max(self.atr_period)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rsi_period == 0 {
            return Err(ConfigError::NonPositivePeriod {
                name: "rsi_period",
                value: self.rsi_period,
            });
        }
        if self.atr_period == 0 {
            return Err(ConfigError::NonPositivePeriod {
                name: "atr_period",
                value: self.atr_period,
            });
        }
        if !self.band_multiplier.is_finite() || self.band_multiplier <= 0.0 {
            return Err(ConfigError::InvalidMultiplier(self.band_multiplier));
        }
        Ok(())
    }
}

/// Thresholds for the signal state machine.
///
/// RSI thresholds above 100 disable the corresponding RSI gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Entries require RSI strictly below this.
    pub rsi_entry_threshold: f64,
    /// RSI strictly above this triggers an exit.
    pub rsi_exit_threshold: f64,
    /// Entries are suppressed while the external score is below this.
    pub min_score_for_entry: f64,
    /// An external score below this forces an exit.
    pub danger_score_for_exit: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_entry_threshold: 70.0,
            rsi_exit_threshold: 80.0,
            min_score_for_entry: 30.0,
            danger_score_for_exit: 15.0,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("rsi_entry_threshold", self.rsi_entry_threshold),
            ("rsi_exit_threshold", self.rsi_exit_threshold),
            ("min_score_for_entry", self.min_score_for_entry),
            ("danger_score_for_exit", self.danger_score_for_exit),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }
}

/// Which non-forced exits the simulator executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Only realize exits above the entry price; underwater sells are ignored.
    #[default]
    ProfitableOnly,
    /// Execute every sell.
    Always,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub fee_rate: f64,
    pub exit_policy: ExitPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            fee_rate: 0.005,
            exit_policy: ExitPolicy::ProfitableOnly,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.initial_capital));
        }
        if !self.fee_rate.is_finite() || !(0.0..1.0).contains(&self.fee_rate) {
            return Err(ConfigError::InvalidFeeRate(self.fee_rate));
        }
        Ok(())
    }
}

/// Everything a single-symbol run needs besides the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub indicators: IndicatorConfig,
    pub signal: SignalConfig,
    pub simulation: SimulationConfig,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicators.validate()?;
        self.signal.validate()?;
        self.simulation.validate()
    }
}
