//! Supertrend-style trailing band.
//!
//! Inherently sequential: the final bands ratchet, and the ridden band flips
//! between resistance (upper) and support (lower) as the close crosses it.
//!
//! - basic bands: mid ± multiplier * ATR, with mid = (high + low) / 2
//! - final upper: min(basic, previous final) unless the previous close was
//!   above the previous final upper, which resets it to the basic band
//! - final lower: symmetric (max, reset when the previous close was below)
//! - the first defined row rides the upper band (bearish)
//!
//! Lookback: that of the ATR it is built on.

use super::atr::{rolling_mean, true_range};
use super::Indicator;
use crate::config::AtrWindow;
use crate::domain::{Candle, TrendSign};

/// Band state at one candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    /// The final band currently ridden.
    pub value: f64,
    pub trend: TrendSign,
    pub final_upper: f64,
    pub final_lower: f64,
}

#[derive(Debug, Clone)]
pub struct Supertrend {
    period: usize,
    multiplier: f64,
    window: AtrWindow,
    name: String,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64, window: AtrWindow) -> Self {
        assert!(period >= 1, "Supertrend period must be >= 1");
        Self {
            period,
            multiplier,
            window,
            name: format!("supertrend_{period}_{multiplier}"),
        }
    }

    /// Band points from a precomputed ATR series of the same length.
    pub fn points_with_atr(&self, candles: &[Candle], atr: &[f64]) -> Vec<Option<BandPoint>> {
        let n = candles.len();
        let mut points = vec![None; n];
        let mut prev: Option<(BandPoint, f64)> = None; // with the previous close

        for i in 0..n {
            let candle = &candles[i];
            let atr_i = atr.get(i).copied().unwrap_or(f64::NAN);
            if !atr_i.is_finite() || candle.is_void() {
                // Undefined rows break the chain; the next valid row re-initializes
                prev = None;
                continue;
            }

            let mid = candle.mid();
            let basic_upper = mid + self.multiplier * atr_i;
            let basic_lower = mid - self.multiplier * atr_i;

            let point = match prev {
                None => BandPoint {
                    value: basic_upper,
                    trend: TrendSign::Bearish,
                    final_upper: basic_upper,
                    final_lower: basic_lower,
                },
                Some((p, prev_close)) => {
                    let final_upper = if prev_close > p.final_upper {
                        basic_upper
                    } else {
                        basic_upper.min(p.final_upper)
                    };
                    let final_lower = if prev_close < p.final_lower {
                        basic_lower
                    } else {
                        basic_lower.max(p.final_lower)
                    };

                    let trend = match p.trend {
                        TrendSign::Bearish if candle.close > final_upper => TrendSign::Bullish,
                        TrendSign::Bullish if candle.close < final_lower => TrendSign::Bearish,
                        unchanged => unchanged,
                    };
                    let value = match trend {
                        TrendSign::Bullish => final_lower,
                        TrendSign::Bearish => final_upper,
                    };

                    BandPoint {
                        value,
                        trend,
                        final_upper,
                        final_lower,
                    }
                }
            };

            points[i] = Some(point);
            prev = Some((point, candle.close));
        }

        points
    }

    /// Band points for a candle series.
    pub fn points(&self, candles: &[Candle]) -> Vec<Option<BandPoint>> {
        let atr = rolling_mean(&true_range(candles), self.period, self.window);
        self.points_with_atr(candles, &atr)
    }
}

impl Indicator for Supertrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        match self.window {
            AtrWindow::Strict => self.period - 1,
            AtrWindow::Immediate => 0,
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        self.points(candles)
            .into_iter()
            .map(|p| p.map_or(f64::NAN, |p| p.value))
            .collect()
    }
}
