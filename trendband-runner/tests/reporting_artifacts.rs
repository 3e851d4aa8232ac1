//! Artifact bundle tests: files written by `save_artifacts` and read back.

use chrono::{Duration, TimeZone, Utc};
use trendband_core::domain::Candle;
use trendband_core::{compute_indicators, IndicatorConfig, StrategyConfig};
use trendband_runner::export::{
    export_indicators_csv, import_json, load_artifacts, save_artifacts, export_json,
};
use trendband_runner::runner::{run_backtest_from_data, BacktestResult, SCHEMA_VERSION};

fn v_candles() -> Vec<Candle> {
    let mut closes: Vec<f64> = (0..30).map(|i| 200.0 - 2.0 * i as f64).collect();
    closes.extend((1..=20).map(|k| 142.0 + 4.0 * k as f64));
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle {
            timestamp: base + Duration::hours(4 * i as i64),
            open: c,
            high: c + 0.5,
            low: c - 0.5,
            close: c,
            volume: 10.0,
        })
        .collect()
}

fn v_result() -> BacktestResult {
    run_backtest_from_data("BTC/USD", &v_candles(), &[], &StrategyConfig::default()).unwrap()
}

#[test]
fn save_writes_full_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let result = v_result();

    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    for name in [
        "manifest.json",
        "trades.csv",
        "ticks.csv",
        "equity.csv",
        "monthly.csv",
        "report.md",
    ] {
        assert!(run_dir.join(name).is_file(), "missing {name}");
    }

    let trades = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades.lines().count(), 2);
    assert!(trades.lines().nth(1).unwrap().contains("rsi_exit"));

    let ticks = std::fs::read_to_string(run_dir.join("ticks.csv")).unwrap();
    let kinds: Vec<&str> = ticks
        .lines()
        .skip(1)
        .map(|l| l.rsplit(',').next().unwrap())
        .collect();
    assert_eq!(kinds, vec!["entry", "exit"]);

    let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity.lines().count(), 3);
    assert!(equity.starts_with("trade_index,equity,drawdown"));
}

#[test]
fn manifest_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let result = v_result();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);
    assert_eq!(loaded.outcome.trades, result.outcome.trades);
    assert_eq!(loaded.metrics, result.metrics);
}

#[test]
fn missing_schema_version_defaults_to_current() {
    let json = export_json(&v_result()).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value.as_object_mut().unwrap().remove("schema_version");

    let loaded = import_json(&value.to_string()).unwrap();
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);
}

#[test]
fn indicator_dump_leaves_warmup_cells_empty() {
    let rows = compute_indicators(&v_candles(), &IndicatorConfig::default());
    let csv = export_indicators_csv(&rows).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), rows.len() + 1);
    assert_eq!(
        lines[0],
        "timestamp,open,high,low,close,volume,rsi,atr,trend_band,trend"
    );
    // First row: nothing defined yet
    assert!(lines[1].ends_with(",,,,"));
    // Row 14: everything defined, bearish
    assert!(lines[15].ends_with(",-1"));
}
