//! Candle series utilities: validation, windowing, resampling, external
//! score alignment and synthetic data.
//!
//! Fetching candles is the job of an external collaborator. Everything here
//! operates on in-memory series that are already sorted by timestamp.

pub mod resample;
pub mod scores;
pub mod series;
pub mod synthetic;

pub use resample::resample;
pub use scores::{align_scores, ScorePoint};
pub use series::{drop_forming, tail, validate_series, DateRange, SeriesError};
pub use synthetic::synthetic_candles;

/// Create daily candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn test_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    use crate::domain::Candle;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}
