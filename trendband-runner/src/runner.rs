//! Backtest runner: wires together data loading, the simulator and metrics.
//!
//! Three entry points:
//! - `run_backtest_from_data()`: pre-loaded candles and scores, no I/O.
//! - `run_single_backtest()`: loads one symbol as configured, then runs. Used by the CLI.
//! - `run_batch()`: every configured symbol in parallel on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use trendband_core::data::SeriesError;
use trendband_core::domain::Candle;
use trendband_core::engine::{SimulationOutcome, Simulator};
use trendband_core::{ConfigError, StrategyConfig};

use crate::config::BacktestConfig;
use crate::data_loader::{dataset_hash, load_symbol, LoadError, LoadedSeries};
use crate::metrics::{monthly_breakdown, MonthlyPerformance, PerformanceMetrics};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single-symbol backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub symbol: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub config: StrategyConfig,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub metrics: PerformanceMetrics,
    pub monthly: Vec<MonthlyPerformance>,
    pub outcome: SimulationOutcome,
    pub warnings: Vec<String>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn initial_capital(&self) -> f64 {
        self.config.simulation.initial_capital
    }
}

/// Aggregate of a multi-symbol batch.
#[derive(Debug)]
pub struct BatchResult {
    /// Successful runs, in configured symbol order.
    pub results: Vec<BacktestResult>,
    /// Symbols that failed, with the reason.
    pub failures: Vec<(String, RunError)>,
}

impl BatchResult {
    pub fn total_net_profit(&self) -> f64 {
        self.results.iter().map(|r| r.metrics.net_profit).sum()
    }

    pub fn total_trades(&self) -> usize {
        self.results.iter().map(|r| r.metrics.trade_count).sum()
    }
}

/// Run a backtest on pre-loaded data: no I/O.
///
/// `scores` is aligned to `candles` by index and may be empty.
pub fn run_backtest_from_data(
    symbol: &str,
    candles: &[Candle],
    scores: &[Option<f64>],
    config: &StrategyConfig,
) -> Result<BacktestResult, RunError> {
    let outcome = Simulator::new(config.clone())?.run(symbol, candles, scores)?;
    Ok(assemble(
        String::new(),
        dataset_hash(candles),
        false,
        Vec::new(),
        config.clone(),
        candles,
        outcome,
    ))
}

/// Load one symbol as configured and run it.
pub fn run_single_backtest(config: &BacktestConfig, symbol: &str) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_symbol(config, symbol)?;
    run_loaded(config, loaded)
}

/// Run every configured symbol in parallel.
///
/// Each task owns its simulation state. A failing symbol does not abort the
/// others; it is reported in `failures`.
pub fn run_batch(config: &BacktestConfig) -> Result<BatchResult, RunError> {
    config.validate()?;
    info!(
        symbols = config.backtest.symbols.len(),
        run_id = %config.run_id(),
        "batch start"
    );

    let outcomes: Vec<(String, Result<BacktestResult, RunError>)> = config
        .backtest
        .symbols
        .par_iter()
        .map(|symbol| (symbol.clone(), run_single_backtest(config, symbol)))
        .collect();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "symbol failed");
                failures.push((symbol, e));
            }
        }
    }

    info!(ok = results.len(), failed = failures.len(), "batch finished");
    Ok(BatchResult { results, failures })
}

fn run_loaded(config: &BacktestConfig, loaded: LoadedSeries) -> Result<BacktestResult, RunError> {
    let strategy = config.strategy();
    let outcome =
        Simulator::new(strategy.clone())?.run(&loaded.symbol, &loaded.candles, &loaded.scores)?;
    Ok(assemble(
        config.run_id(),
        loaded.dataset_hash,
        loaded.synthetic,
        loaded.warnings,
        strategy,
        &loaded.candles,
        outcome,
    ))
}

fn assemble(
    run_id: String,
    dataset_hash: String,
    has_synthetic: bool,
    mut warnings: Vec<String>,
    config: StrategyConfig,
    candles: &[Candle],
    outcome: SimulationOutcome,
) -> BacktestResult {
    let metrics = PerformanceMetrics::compute(
        &outcome.equity_curve,
        &outcome.drawdown_curve,
        &outcome.trades,
        config.simulation.initial_capital,
    );
    let monthly = monthly_breakdown(&outcome.trades);
    warnings.extend(outcome.warnings.iter().cloned());

    // Without a config file there is nothing else to fingerprint
    let run_id = if run_id.is_empty() {
        let canonical = format!("{config:?}|{dataset_hash}");
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    } else {
        run_id
    };

    BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        symbol: outcome.symbol.clone(),
        start: candles.first().map(|c| c.timestamp.to_rfc3339()),
        end: candles.last().map(|c| c.timestamp.to_rfc3339()),
        config,
        dataset_hash,
        has_synthetic,
        metrics,
        monthly,
        outcome,
        warnings,
    }
}
