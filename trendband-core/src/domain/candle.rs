//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle for a single interval.
///
/// A series of candles is ordered ascending by `timestamp`, with unique
/// timestamps. Spacing between candles is not required to be uniform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLC field is NaN or infinite (void candle).
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Midpoint of the candle's range, (high + low) / 2.
    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}
