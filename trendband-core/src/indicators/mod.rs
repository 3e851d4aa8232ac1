//! Indicator engine: RSI, ATR and the Supertrend-style trailing band.
//!
//! Indicators are pure functions: candle history in, numeric series out.
//! `compute_indicators` runs all three once over a series and attaches the
//! results to each candle as an `IndicatorRow`.

pub mod atr;
pub mod rsi;
pub mod supertrend;

pub use atr::Atr;
pub use rsi::Rsi;
pub use supertrend::{BandPoint, Supertrend};

use crate::config::IndicatorConfig;
use crate::domain::{Candle, IndicatorRow};

/// Trait for indicators.
///
/// Indicators take a full candle series and produce a numeric output series
/// of the same length. The first `lookback()` values are `f64::NAN` (warm-up).
///
/// # Look-ahead contamination guard
/// No indicator value at candle t may depend on price data from candle t+1
/// or later. Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading candles without a valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Attach RSI, ATR and trend band columns to every candle.
///
/// Deterministic and side-effect free; the input is never mutated. Fields
/// are `None` until their indicator has enough history.
pub fn compute_indicators(candles: &[Candle], config: &IndicatorConfig) -> Vec<IndicatorRow> {
    let rsi = Rsi::new(config.rsi_period, config.rsi_smoothing).compute(candles);
    let atr = Atr::new(config.atr_period, config.atr_window).compute(candles);
    let band = Supertrend::new(config.atr_period, config.band_multiplier, config.atr_window)
        .points_with_atr(candles, &atr);

    candles
        .iter()
        .zip(rsi)
        .zip(atr)
        .zip(band)
        .map(|(((candle, rsi), atr), band)| IndicatorRow {
            candle: *candle,
            rsi: defined(rsi),
            atr: defined(atr),
            trend_band_value: band.map(|b| b.value),
            trend_sign: band.map(|b| b.trend),
        })
        .collect()
}

fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Create candles from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: base + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
