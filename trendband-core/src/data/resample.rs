//! Aggregate candles into coarser, epoch-aligned buckets.

use chrono::{DateTime, Duration, Utc};

use crate::domain::Candle;

/// Resample a sorted series into buckets of `interval`.
///
/// Each output candle is stamped with its bucket start and carries the first
/// open, highest high, lowest low, last close and summed volume. Empty
/// buckets produce no candle. A non-positive interval returns the input.
pub fn resample(candles: &[Candle], interval: Duration) -> Vec<Candle> {
    let secs = interval.num_seconds();
    if secs <= 0 {
        return candles.to_vec();
    }

    let mut out: Vec<Candle> = Vec::new();
    for candle in candles {
        let bucket = bucket_start(candle.timestamp, secs);
        match out.last_mut() {
            Some(current) if current.timestamp == bucket => {
                current.high = current.high.max(candle.high);
                current.low = current.low.min(candle.low);
                current.close = candle.close;
                current.volume += candle.volume;
            }
            _ => out.push(Candle {
                timestamp: bucket,
                ..*candle
            }),
        }
    }
    out
}

fn bucket_start(timestamp: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    let ts = timestamp.timestamp();
    let floored = ts - ts.rem_euclid(secs);
    DateTime::from_timestamp(floored, 0).unwrap_or(timestamp)
}
