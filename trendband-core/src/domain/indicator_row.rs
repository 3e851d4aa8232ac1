//! IndicatorRow: a candle with its derived indicator columns attached.

use serde::{Deserialize, Serialize};

use super::candle::Candle;
use super::signal::TrendSign;

/// A candle plus the indicator values computed from history up to it.
///
/// Each derived field is `None` until its indicator has enough history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub candle: Candle,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub trend_band_value: Option<f64>,
    pub trend_sign: Option<TrendSign>,
}

impl IndicatorRow {
    /// A row with no derived values.
    pub fn bare(candle: Candle) -> Self {
        Self {
            candle,
            rsi: None,
            atr: None,
            trend_band_value: None,
            trend_sign: None,
        }
    }

    /// True when every derived field is present.
    pub fn is_complete(&self) -> bool {
        self.rsi.is_some()
            && self.atr.is_some()
            && self.trend_band_value.is_some()
            && self.trend_sign.is_some()
    }
}
