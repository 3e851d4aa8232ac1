//! trendband core: candle domain types, indicator engine, signal state
//! machine and backtest simulator.
//!
//! Data flow: candles → `indicators::compute_indicators` → one
//! `signal::SignalGenerator` evaluation per closed candle →
//! `engine::Simulator` (position and capital updates) → trade ledger,
//! tick log, equity and drawdown curves.

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signal;

pub use config::{
    AtrWindow, ConfigError, ExitPolicy, IndicatorConfig, RsiSmoothing, SignalConfig,
    SimulationConfig, StrategyConfig,
};
pub use engine::{run_simulation, SimulationError, SimulationOutcome, Simulator};
pub use indicators::compute_indicators;
pub use signal::{generate_signal, SignalContext, SignalGenerator, TrendRsiSignal};
