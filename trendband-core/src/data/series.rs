//! Candle series checks and windowing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::Candle;

/// Structural problems with a candle series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("timestamps not strictly increasing at index {index}: {previous} then {current}")]
    NotIncreasing {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("void candle (non-finite OHLC) at index {index} ({timestamp})")]
    VoidCandle {
        index: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Check that a series is strictly increasing in time and has no void candles.
///
/// Gaps between candles are allowed.
pub fn validate_series(candles: &[Candle]) -> Result<(), SeriesError> {
    for (index, candle) in candles.iter().enumerate() {
        if candle.is_void() {
            return Err(SeriesError::VoidCandle {
                index,
                timestamp: candle.timestamp,
            });
        }
        if index > 0 {
            let previous = candles[index - 1].timestamp;
            if candle.timestamp <= previous {
                return Err(SeriesError::NotIncreasing {
                    index,
                    previous,
                    current: candle.timestamp,
                });
            }
        }
    }
    Ok(())
}

/// Inclusive time range. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, ConfigError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ConfigError::InvalidRange { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| timestamp >= s) && self.end.map_or(true, |e| timestamp <= e)
    }

    /// Sub-slice of a sorted series that falls inside the range.
    pub fn slice<'a>(&self, candles: &'a [Candle]) -> &'a [Candle] {
        let from = candles.partition_point(|c| self.start.map_or(false, |s| c.timestamp < s));
        let to = candles.partition_point(|c| self.end.map_or(true, |e| c.timestamp <= e));
        &candles[from..to.max(from)]
    }
}

/// The most recent `n` candles.
pub fn tail(candles: &[Candle], n: usize) -> &[Candle] {
    &candles[candles.len().saturating_sub(n)..]
}

/// Drop the last candle, which on a live feed is still forming.
pub fn drop_forming(candles: &[Candle]) -> &[Candle] {
    match candles.split_last() {
        Some((_, closed)) => closed,
        None => candles,
    }
}
