//! Criterion benchmarks for trendband hot paths.
//!
//! Benchmarks:
//! 1. Indicator engine (RSI + ATR + band over a full series)
//! 2. Full simulation (indicators, per-candle signal, bookkeeping)
//! 3. Single signal evaluation on precomputed rows

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{Duration, TimeZone, Utc};
use trendband_core::config::{IndicatorConfig, SignalConfig, StrategyConfig};
use trendband_core::domain::Candle;
use trendband_core::signal::SignalContext;
use trendband_core::{compute_indicators, generate_signal, Simulator};

fn make_candles(n: usize) -> Vec<Candle> {
    let base = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Candle {
                timestamp: base + Duration::minutes(15 * i as i64),
                open,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000.0 + (i % 500) as f64,
            }
        })
        .collect()
}

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_indicators");
    let config = IndicatorConfig::default();
    for n in [500, 5_000, 50_000] {
        let candles = make_candles(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &candles, |b, candles| {
            b.iter(|| compute_indicators(black_box(candles), &config))
        });
    }
    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator_run");
    let simulator = Simulator::new(StrategyConfig::default()).expect("default config is valid");
    for n in [500, 5_000, 50_000] {
        let candles = make_candles(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &candles, |b, candles| {
            b.iter(|| simulator.run("BENCH", black_box(candles), &[]))
        });
    }
    group.finish();
}

fn bench_signal(c: &mut Criterion) {
    let config = IndicatorConfig::default();
    let rows = compute_indicators(&make_candles(1_000), &config);
    let signal_config = SignalConfig::default();
    let ctx = SignalContext {
        previous_trend: None,
        score: Some(50.0),
    };
    c.bench_function("generate_signal", |b| {
        b.iter(|| generate_signal(black_box(&rows), &signal_config, config.warmup(), &ctx))
    });
}

criterion_group!(benches, bench_indicators, bench_simulation, bench_signal);
criterion_main!(benches);
