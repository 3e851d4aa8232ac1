//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade summary, tick log, equity/drawdown, monthly breakdown,
//!   indicator dump
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use trendband_core::domain::{IndicatorRow, TickEvent, Trade};

use crate::metrics::MonthlyPerformance;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Export the trade ledger as CSV.
///
/// Columns: symbol, entry_time, entry_price, exit_time, exit_price,
/// exit_reason, quantity, pnl, return_pct, entry_fee, exit_fee, bars_held,
/// holding_hrs
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "exit_reason",
        "quantity",
        "pnl",
        "return_pct",
        "entry_fee",
        "exit_fee",
        "bars_held",
        "holding_hrs",
    ])?;

    for t in trades {
        wtr.write_record([
            t.symbol.clone(),
            t.entry_time.to_rfc3339(),
            format!("{:.6}", t.entry_price),
            t.exit_time.to_rfc3339(),
            format!("{:.6}", t.exit_price),
            t.exit_reason.as_str().to_string(),
            format!("{:.8}", t.quantity),
            format!("{:.2}", t.pnl),
            format!("{:.4}", t.return_pct() * 100.0),
            format!("{:.2}", t.entry_fee),
            format!("{:.2}", t.exit_fee),
            t.bars_held.to_string(),
            format!("{:.2}", t.holding().num_seconds() as f64 / 3600.0),
        ])?;
    }

    finish(wtr)
}

/// Export the tick log as `timestamp,price,type`.
pub fn export_ticks_csv(ticks: &[TickEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "price", "type"])?;
    for tick in ticks {
        wtr.write_record([
            tick.timestamp.to_rfc3339(),
            format!("{:.6}", tick.price),
            tick.kind.as_str().to_string(),
        ])?;
    }
    finish(wtr)
}

/// Export equity and drawdown as `trade_index,equity,drawdown`.
pub fn export_equity_csv(equity_curve: &[f64], drawdown_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade_index", "equity", "drawdown"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        let dd = drawdown_curve.get(i).copied().unwrap_or(0.0);
        wtr.write_record([&i.to_string(), &format!("{eq:.2}"), &format!("{dd:.2}")])?;
    }
    finish(wtr)
}

pub fn export_monthly_csv(months: &[MonthlyPerformance]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["month", "trades", "net_profit", "win_rate"])?;
    for m in months {
        wtr.write_record([
            &m.month,
            &m.trade_count.to_string(),
            &format!("{:.2}", m.net_profit),
            &format!("{:.4}", m.win_rate),
        ])?;
    }
    finish(wtr)
}

/// Export indicator rows. Undefined values are empty cells.
pub fn export_indicators_csv(rows: &[IndicatorRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "open",
        "high",
        "low",
        "close",
        "volume",
        "rsi",
        "atr",
        "trend_band",
        "trend",
    ])?;
    for row in rows {
        let c = &row.candle;
        wtr.write_record([
            c.timestamp.to_rfc3339(),
            format!("{:.6}", c.open),
            format!("{:.6}", c.high),
            format!("{:.6}", c.low),
            format!("{:.6}", c.close),
            format!("{:.4}", c.volume),
            fmt_opt(row.rsi),
            fmt_opt(row.atr),
            fmt_opt(row.trend_band_value),
            row.trend_sign
                .map(|t| t.as_i8().to_string())
                .unwrap_or_default(),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a run: `{symbol}_{run_id prefix}` with `/` replaced.
pub fn artifact_dir_name(result: &BacktestResult) -> String {
    let prefix: String = result.run_id.chars().take(12).collect();
    format!("{}_{}", result.symbol.replace('/', "-"), prefix)
}

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{run_id prefix}/` under `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: trade summary
/// - `ticks.csv`: entry/exit tick log
/// - `equity.csv`: equity and drawdown per realized trade
/// - `monthly.csv`: per-month breakdown
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let outcome = &result.outcome;
    let files = [
        ("manifest.json", export_json(result)?),
        ("trades.csv", export_trades_csv(&outcome.trades)?),
        ("ticks.csv", export_ticks_csv(&outcome.ticks)?),
        (
            "equity.csv",
            export_equity_csv(&outcome.equity_curve, &outcome.drawdown_curve)?,
        ),
        ("monthly.csv", export_monthly_csv(&result.monthly)?),
        ("report.md", generate_report(result)),
    ];
    for (name, content) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let outcome = &result.outcome;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start.as_deref().unwrap_or("-"),
        result.end.as_deref().unwrap_or("-")
    ));
    md.push_str(&format!(
        "| Initial Capital | {:.2} |\n",
        result.initial_capital()
    ));
    md.push_str(&format!(
        "| Candles | {} ({} warm-up) |\n",
        outcome.candle_count, outcome.warmup_bars
    ));
    md.push_str(&format!("| Signals | {} |\n", outcome.signals.len()));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!("| Net Profit | {:.2} |\n", m.net_profit));
    md.push_str(&format!("| Final Equity | {:.2} |\n", m.final_equity));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!(
        "| Max Drawdown | {:.2} ({:.2}%) |\n",
        m.max_drawdown,
        m.max_drawdown_pct * 100.0
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!(
        "| Avg Holding | {:.2} hrs |\n",
        m.avg_holding_secs / 3600.0
    ));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!(
        "| Max Consecutive Losses | {} |\n",
        m.max_consecutive_losses
    ));
    md.push('\n');

    if let Some(pos) = &outcome.open_position {
        md.push_str("## Open Position\n\n");
        md.push_str(&format!(
            "Long {:.6} since {} at {:.2}\n\n",
            pos.quantity,
            pos.entry_time.to_rfc3339(),
            pos.entry_price
        ));
    }

    if !result.monthly.is_empty() {
        md.push_str("## Monthly\n\n");
        md.push_str("| Month | Trades | Net Profit | Win Rate |\n");
        md.push_str("| --- | --- | --- | --- |\n");
        for month in &result.monthly {
            md.push_str(&format!(
                "| {} | {} | {:.2} | {:.1}% |\n",
                month.month,
                month.trade_count,
                month.net_profit,
                month.win_rate * 100.0
            ));
        }
        md.push('\n');
    }

    if !result.warnings.is_empty() {
        md.push_str("## Warnings\n\n");
        for w in &result.warnings {
            md.push_str(&format!("- {w}\n"));
        }
        md.push('\n');
    }

    md
}
