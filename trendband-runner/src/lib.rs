//! trendband runner: backtest orchestration, data loading, metrics, artifacts.
//!
//! This crate builds on `trendband-core` to provide:
//! - TOML configuration with validation and a deterministic run ID
//! - CSV candle/score loading with a synthetic-data fallback
//! - Single-symbol and parallel multi-symbol runs
//! - Performance metrics and a monthly breakdown
//! - JSON, CSV and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigFileError, RunId};
pub use data_loader::{load_symbol, LoadError, LoadedSeries};
pub use export::{
    export_indicators_csv, export_json, generate_report, import_json, load_artifacts,
    save_artifacts,
};
pub use metrics::{MonthlyPerformance, PerformanceMetrics};
pub use runner::{
    run_backtest_from_data, run_batch, run_single_backtest, BacktestResult, BatchResult, RunError,
    SCHEMA_VERSION,
};
