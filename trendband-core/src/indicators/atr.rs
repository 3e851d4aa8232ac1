//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR is the rolling mean of true range over `period`, windowed per
//! `AtrWindow`: strict (first value at index period-1) or immediate
//! (shrinking window, first value at index 0).

use super::Indicator;
use crate::config::AtrWindow;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    window: AtrWindow,
    name: String,
}

impl Atr {
    pub fn new(period: usize, window: AtrWindow) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            window,
            name: format!("atr_{period}"),
        }
    }
}

/// True range per candle. The first candle has no previous close, so its
/// range is just high - low.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let n = candles.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    tr[0] = candles[0].high - candles[0].low;

    for i in 1..n {
        let h = candles[i].high;
        let l = candles[i].low;
        let pc = candles[i - 1].close;
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }

    // f64::max ignores a NaN operand; a void candle must not produce a range
    for (i, c) in candles.iter().enumerate() {
        if c.is_void() || (i > 0 && !candles[i - 1].close.is_finite()) {
            tr[i] = f64::NAN;
        }
    }

    tr
}

/// Rolling mean over `period` values.
///
/// `Strict` leaves the first `period - 1` entries NaN. `Immediate` averages
/// over whatever is available (at most `period` values). Windows containing
/// NaN are NaN.
pub fn rolling_mean(values: &[f64], period: usize, window: AtrWindow) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    for i in 0..n {
        let available = i + 1;
        if window == AtrWindow::Strict && available < period {
            continue;
        }
        let slice = &values[available.saturating_sub(period)..=i];
        if slice.iter().all(|v| v.is_finite()) {
            result[i] = slice.iter().sum::<f64>() / slice.len() as f64;
        }
    }

    result
}

impl Indicator for Atr {
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
        rolling_mean(&true_range(candles), self.period, self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_candles, DEFAULT_EPSILON};

    fn five() -> Vec<Candle> {
        make_ohlc_candles(&[
            (50.0, 54.0, 48.0, 53.0),  // TR = 6
            (53.0, 56.0, 52.0, 55.0),  // TR = max(4, 3, 1) = 4
            (55.0, 55.5, 49.0, 50.0),  // TR = max(6.5, 0.5, 6) = 6.5
            (50.0, 52.0, 47.0, 51.0),  // TR = max(5, 2, 3) = 5
            (51.0, 55.0, 50.0, 54.0),  // TR = max(5, 4, 1) = 5
        ])
    }

    #[test]
    fn true_range_uses_previous_close() {
        let tr = true_range(&five());
        assert_approx(tr[0], 6.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 4.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 6.5, DEFAULT_EPSILON);
        assert_approx(tr[3], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_spans_overnight_gap() {
        let candles = make_ohlc_candles(&[
            (40.0, 42.0, 39.0, 41.0),
            (47.0, 50.0, 46.0, 49.0), // range 4, but 50 - 41 = 9
        ]);
        assert_approx(true_range(&candles)[1], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn strict_window_waits_for_period() {
        let result = Atr::new(3, AtrWindow::Strict).compute(&five());
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 16.5 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[3], 15.5 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 16.5 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn immediate_window_shrinks_at_start() {
        let result = Atr::new(3, AtrWindow::Immediate).compute(&five());
        assert_approx(result[0], 6.0, DEFAULT_EPSILON);
        assert_approx(result[1], 5.0, DEFAULT_EPSILON);
        assert_approx(result[2], 5.5, DEFAULT_EPSILON);
        assert_approx(result[3], 15.5 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn windows_agree_once_full() {
        let candles = five();
        let strict = Atr::new(3, AtrWindow::Strict).compute(&candles);
        let immediate = Atr::new(3, AtrWindow::Immediate).compute(&candles);
        for i in 2..candles.len() {
            assert_approx(strict[i], immediate[i], DEFAULT_EPSILON);
        }
    }

    #[test]
    fn void_candle_blanks_its_windows() {
        let mut candles = five();
        candles[1].high = f64::NAN;
        let result = Atr::new(2, AtrWindow::Strict).compute(&candles);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_approx(result[3], 11.5 / 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn lookback_depends_on_window() {
        assert_eq!(Atr::new(14, AtrWindow::Strict).lookback(), 13);
        assert_eq!(Atr::new(14, AtrWindow::Immediate).lookback(), 0);
    }
}
