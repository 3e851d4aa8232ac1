//! trendband CLI: backtest, live-signal check and indicator dump commands.
//!
//! Commands:
//! - `run`: backtest one symbol or every configured symbol, save artifacts
//! - `signal`: evaluate the latest closed candle of a CSV and print the signal
//! - `indicators`: dump per-candle RSI / ATR / trend band to CSV

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendband_core::data::align_scores;
use trendband_core::domain::Candle;
use trendband_core::signal::SignalContext;
use trendband_core::{compute_indicators, generate_signal};
use trendband_runner::config::BacktestConfig;
use trendband_runner::data_loader::{
    clean_candles, load_candles_csv, load_scores_csv, load_symbol, prepare_candles,
};
use trendband_runner::export::{export_indicators_csv, save_artifacts};
use trendband_runner::runner::run_batch;
use trendband_runner::BacktestResult;

#[derive(Parser)]
#[command(
    name = "trendband",
    about = "trendband: trend-band / RSI signal engine and backtester"
)]
struct Cli {
    /// Log filter (e.g. info, debug, trendband_core=debug). RUST_LOG wins if set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest from a TOML config file.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run only this symbol instead of the configured list.
        #[arg(long)]
        symbol: Option<String>,

        /// Use synthetic candles instead of CSV files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for artifacts (overrides [output].dir).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Validate the config and load data, but run and write nothing.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Evaluate the signal on the latest closed candle of a CSV file.
    Signal {
        /// Candle CSV: timestamp,open,high,low,close,volume.
        #[arg(long)]
        candles: PathBuf,

        /// TOML config for indicator and signal parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Score CSV: timestamp,score.
        #[arg(long)]
        scores: Option<PathBuf>,

        /// Treat the last candle as still forming and ignore it.
        #[arg(long, default_value_t = false)]
        exclude_forming: bool,
    },
    /// Write per-candle indicator values to CSV.
    Indicators {
        /// Candle CSV: timestamp,open,high,low,close,volume.
        #[arg(long)]
        candles: PathBuf,

        /// TOML config for indicator parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            symbol,
            synthetic,
            output_dir,
            dry_run,
        } => run_backtest_cmd(config, symbol, synthetic, output_dir, dry_run),
        Commands::Signal {
            candles,
            config,
            scores,
            exclude_forming,
        } => run_signal_cmd(&candles, config, scores, exclude_forming),
        Commands::Indicators {
            candles,
            config,
            out,
        } => run_indicators_cmd(&candles, config, &out),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn run_backtest_cmd(
    config_path: Option<PathBuf>,
    symbol: Option<String>,
    synthetic: bool,
    output_dir: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(symbol) = symbol {
        config.backtest.symbols = vec![symbol];
    }
    if synthetic {
        config.data.synthetic = true;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    config.validate()?;

    info!(run_id = %config.run_id(), symbols = ?config.backtest.symbols, "config loaded");

    if dry_run {
        for symbol in &config.backtest.symbols {
            let loaded = load_symbol(&config, symbol)?;
            println!(
                "{symbol}: {} candles ({} to {}){}",
                loaded.candles.len(),
                loaded.candles.first().map(|c| c.timestamp.to_rfc3339()).unwrap_or_default(),
                loaded.candles.last().map(|c| c.timestamp.to_rfc3339()).unwrap_or_default(),
                if loaded.synthetic { " [synthetic]" } else { "" }
            );
            for warn in &loaded.warnings {
                println!("  WARNING: {warn}");
            }
        }
        println!();
        println!("{}", config.to_toml()?);
        println!("Dry run: nothing executed or written.");
        return Ok(());
    }

    let batch = run_batch(&config)?;

    for result in &batch.results {
        print_summary(result);
        let run_dir = save_artifacts(result, &config.output.dir)?;
        if config.output.write_indicators {
            let loaded = load_symbol(&config, &result.symbol)?;
            let rows = compute_indicators(&loaded.candles, &config.indicators);
            let path = run_dir.join("indicators.csv");
            std::fs::write(&path, export_indicators_csv(&rows)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        println!("Artifacts saved to: {}", run_dir.display());
    }

    for (symbol, err) in &batch.failures {
        eprintln!("Error for {symbol}: {err}");
    }
    if batch.results.is_empty() {
        bail!("no symbol completed");
    }
    if batch.results.len() > 1 {
        println!(
            "Batch: {} symbols, {} trades, net profit {:.2}",
            batch.results.len(),
            batch.total_trades(),
            batch.total_net_profit()
        );
    }

    Ok(())
}

/// Load a candle CSV and apply the configured window.
///
/// Also returns the cleaning warnings (void rows, duplicate timestamps).
fn load_windowed(
    path: &Path,
    config: &BacktestConfig,
    exclude_forming: bool,
) -> Result<(Vec<Candle>, Vec<String>)> {
    let raw = load_candles_csv(path)?;
    let (clean, warnings) = clean_candles(raw);
    let mut section = config.backtest.clone();
    section.exclude_forming_candle |= exclude_forming;
    let name = path.display().to_string();
    Ok((prepare_candles(&name, &clean, &section)?, warnings))
}

/// Stderr, so `signal` keeps stdout as pure JSON.
fn print_load_warnings(warnings: &[String]) {
    for warn in warnings {
        eprintln!("  WARNING: {warn}");
    }
}

fn run_signal_cmd(
    candles_path: &Path,
    config_path: Option<PathBuf>,
    scores_path: Option<PathBuf>,
    exclude_forming: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let (candles, warnings) = load_windowed(candles_path, &config, exclude_forming)?;
    print_load_warnings(&warnings);
    let rows = compute_indicators(&candles, &config.indicators);

    let score = match scores_path {
        Some(path) => align_scores(&candles, &load_scores_csv(&path)?)
            .last()
            .copied()
            .flatten(),
        None => None,
    };
    let ctx = SignalContext {
        previous_trend: None,
        score,
    };
    let signal = generate_signal(&rows, &config.signal, config.indicators.warmup(), &ctx);

    let report = json!({
        "signal": signal.label(),
        "detail": signal,
        "score": score,
        "candles": candles.len(),
        "row": rows.last(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_indicators_cmd(candles_path: &Path, config_path: Option<PathBuf>, out: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let (candles, warnings) = load_windowed(candles_path, &config, false)?;
    print_load_warnings(&warnings);
    let rows = compute_indicators(&candles, &config.indicators);

    std::fs::write(out, export_indicators_csv(&rows)?)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("Wrote {} rows to {}", rows.len(), out.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    let outcome = &result.outcome;

    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!(
        "Period:         {} to {}",
        result.start.as_deref().unwrap_or("-"),
        result.end.as_deref().unwrap_or("-")
    );
    println!(
        "Candles:        {} ({} warm-up)",
        outcome.candle_count, outcome.warmup_bars
    );
    println!("Signals:        {}", outcome.signals.len());
    println!("Trades:         {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Net Profit:     {:.2}", m.net_profit);
    println!("Final Equity:   {:.2}", m.final_equity);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!(
        "Max Drawdown:   {:.2} ({:.2}%)",
        m.max_drawdown,
        m.max_drawdown_pct * 100.0
    );
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Avg Holding:    {:.2} hrs", m.avg_holding_secs / 3600.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Max Consec Loss:{}", m.max_consecutive_losses);
    if let Some(pos) = &outcome.open_position {
        println!(
            "Open Position:  {:.6} @ {:.2} since {}",
            pos.quantity,
            pos.entry_price,
            pos.entry_time.to_rfc3339()
        );
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for warn in &result.warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("candles.csv");
        std::fs::write(&path, format!("timestamp,open,high,low,close,volume\n{body}")).unwrap();
        path
    }

    #[test]
    fn windowed_load_keeps_cleaning_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "2024-01-01 00:00:00,100,101,99,100,1\n\
             2024-01-01 04:00:00,101,102,100,101,1\n\
             2024-01-01 04:00:00,101,103,100,102,1\n\
             2024-01-01 08:00:00,NaN,NaN,NaN,NaN,1\n",
        );

        let (candles, warnings) =
            load_windowed(&path, &BacktestConfig::default(), false).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 102.0);
        assert_eq!(warnings.len(), 2, "warnings: {warnings:?}");
        assert!(warnings.iter().any(|w| w.contains("duplicate")));
        assert!(warnings.iter().any(|w| w.contains("non-finite")));
    }

    #[test]
    fn clean_file_has_no_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "2024-01-01 00:00:00,100,101,99,100,1\n\
             2024-01-01 04:00:00,101,102,100,101,1\n",
        );

        let (candles, warnings) = load_windowed(&path, &BacktestConfig::default(), true).unwrap();
        // Forming-candle exclusion drops the last row
        assert_eq!(candles.len(), 1);
        assert!(warnings.is_empty());
    }
}
