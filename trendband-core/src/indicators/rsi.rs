//! Relative Strength Index (RSI).
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), over close-to-close deltas.
//! Averaging is either a simple rolling mean or Wilder smoothing.
//! Lookback: period (first value at index `period`).
//! Edge case: avg_loss == 0 → RSI = 100, including a flat window.

use super::Indicator;
use crate::config::RsiSmoothing;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    smoothing: RsiSmoothing,
    name: String,
}

impl Rsi {
    pub fn new(period: usize, smoothing: RsiSmoothing) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            smoothing,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period + 1 {
            return result;
        }

        // changes[0] has no previous close
        let mut changes = vec![f64::NAN; n];
        for i in 1..n {
            changes[i] = candles[i].close - candles[i - 1].close;
        }

        match self.smoothing {
            RsiSmoothing::Simple => {
                for i in self.period..n {
                    let window = &changes[i + 1 - self.period..=i];
                    if let Some((gain, loss)) = mean_gain_loss(window) {
                        result[i] = compute_rsi(gain, loss);
                    }
                }
            }
            RsiSmoothing::Wilder => {
                let (mut avg_gain, mut avg_loss) = match mean_gain_loss(&changes[1..=self.period]) {
                    Some(seed) => seed,
                    None => return result,
                };
                result[self.period] = compute_rsi(avg_gain, avg_loss);

                let alpha = 1.0 / self.period as f64;
                for i in (self.period + 1)..n {
                    let ch = changes[i];
                    if !ch.is_finite() {
                        // Once broken, Wilder state cannot recover
                        return result;
                    }
                    let gain = ch.max(0.0);
                    let loss = (-ch).max(0.0);
                    avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
                    avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
                    result[i] = compute_rsi(avg_gain, avg_loss);
                }
            }
        }

        result
    }
}

/// Mean gain and mean loss (as a positive number) over a window of deltas.
/// `None` if any delta is not finite.
fn mean_gain_loss(changes: &[f64]) -> Option<(f64, f64)> {
    let mut gain = 0.0;
    let mut loss = 0.0;
    for &ch in changes {
        if !ch.is_finite() {
            return None;
        }
        if ch > 0.0 {
            gain += ch;
        } else {
            loss -= ch;
        }
    }
    let len = changes.len() as f64;
    Some((gain / len, loss / len))
}

pub(crate) fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
