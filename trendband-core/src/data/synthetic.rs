//! Synthetic candles for demos and tests.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::Candle;

/// Generate a deterministic random-walk series.
///
/// Starts at 100.0. The seed is a BLAKE3 hash of the symbol, so the same
/// symbol always yields the same candles. These are clearly fake data.
pub fn synthetic_candles(
    symbol: &str,
    start: DateTime<Utc>,
    interval: Duration,
    count: usize,
) -> Vec<Candle> {
    let seed_bytes = blake3::hash(symbol.as_bytes());
    let seed: [u8; 32] = *seed_bytes.as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut candles = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut timestamp = start;

    for _ in 0..count {
        let step_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + step_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(10.0..1_000.0);

        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        timestamp += interval;
    }

    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::validate_series;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn deterministic_per_symbol() {
        let a = synthetic_candles("BTC/USD", start(), Duration::hours(4), 50);
        let b = synthetic_candles("BTC/USD", start(), Duration::hours(4), 50);
        let c = synthetic_candles("ETH/USD", start(), Duration::hours(4), 50);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn candles_are_valid() {
        let candles = synthetic_candles("BTC/USD", start(), Duration::hours(4), 200);
        assert_eq!(candles.len(), 200);
        assert!(validate_series(&candles).is_ok());
        assert!(candles.iter().all(|c| c.is_sane()));
    }
}
