//! Signal state machine: turns indicator rows into buy / sell / none.
//!
//! Signals are portfolio-agnostic: they receive indicator history and an
//! optional external score, never position state. The only state carried
//! between evaluations is the previous trend sign, and the caller owns it.

use serde::{Deserialize, Serialize};

use crate::config::SignalConfig;
use crate::domain::{ExitReason, IndicatorRow, Signal, TrendSign};

/// Caller-held inputs for one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalContext {
    /// Trend sign of the previous closed row. When `None`, the evaluator
    /// falls back to the second-to-last row it was given.
    pub previous_trend: Option<TrendSign>,
    /// External score for this step. `None` means no gating.
    pub score: Option<f64>,
}

/// Trait for signal generators.
///
/// # Architecture invariant
/// `evaluate` receives only closed rows (`rows[..=now]`) and must not look
/// at anything else. The forming candle is the caller's to exclude.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "trend_rsi").
    fn name(&self) -> &str;

    /// Number of rows needed before this signal can produce output.
    fn warmup_bars(&self) -> usize;

    /// Evaluate the most recent row of `rows`.
    fn evaluate(&self, rows: &[IndicatorRow], ctx: &SignalContext) -> Signal;
}

/// Trend-band flip entries gated by RSI and an external score.
///
/// Rules, first match wins:
/// 1. not enough rows, or the last row lacks trend, RSI or close → none
/// 2. score below the danger threshold → forced sell
/// 3. bearish trend, or RSI above the exit threshold → sell
/// 4. bearish → bullish flip with RSI below the entry threshold and the
///    score (if any) at or above the entry minimum → buy
/// 5. otherwise none
#[derive(Debug, Clone)]
pub struct TrendRsiSignal {
    config: SignalConfig,
    warmup: usize,
}

impl TrendRsiSignal {
    pub fn new(config: SignalConfig, warmup: usize) -> Self {
        Self { config, warmup }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }
}

impl SignalGenerator for TrendRsiSignal {
    fn name(&self) -> &str {
        "trend_rsi"
    }

    fn warmup_bars(&self) -> usize {
        self.warmup
    }

    fn evaluate(&self, rows: &[IndicatorRow], ctx: &SignalContext) -> Signal {
        if rows.len() < self.warmup {
            return Signal::None;
        }
        let Some(current) = rows.last() else {
            return Signal::None;
        };
        let (Some(trend), Some(rsi)) = (current.trend_sign, current.rsi) else {
            return Signal::None;
        };
        if !current.candle.close.is_finite() {
            return Signal::None;
        }

        if let Some(score) = ctx.score {
            if score < self.config.danger_score_for_exit {
                return Signal::Sell(ExitReason::DangerScore);
            }
        }

        // Exit before entry: a sell is never masked by a simultaneous buy
        if trend == TrendSign::Bearish {
            return Signal::Sell(ExitReason::TrendReversal);
        }
        if rsi > self.config.rsi_exit_threshold {
            return Signal::Sell(ExitReason::RsiExit);
        }

        let previous = ctx.previous_trend.or_else(|| {
            rows.len()
                .checked_sub(2)
                .and_then(|i| rows[i].trend_sign)
        });
        let flipped = previous == Some(TrendSign::Bearish) && trend == TrendSign::Bullish;
        let score_ok = ctx
            .score
            .map_or(true, |s| s >= self.config.min_score_for_entry);

        if flipped && rsi < self.config.rsi_entry_threshold && score_ok {
            Signal::Buy
        } else {
            Signal::None
        }
    }
}

/// Evaluate the latest closed row with the default trend/RSI rules.
pub fn generate_signal(
    rows: &[IndicatorRow],
    config: &SignalConfig,
    warmup: usize,
    ctx: &SignalContext,
) -> Signal {
    TrendRsiSignal::new(config.clone(), warmup).evaluate(rows, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_candles;

    fn row(trend: Option<TrendSign>, rsi: Option<f64>) -> IndicatorRow {
        let candle = test_candles(&[100.0])[0];
        IndicatorRow {
            candle,
            rsi,
            atr: Some(1.0),
            trend_band_value: Some(95.0),
            trend_sign: trend,
        }
    }

    fn flip_rows(rsi: f64) -> Vec<IndicatorRow> {
        vec![
            row(Some(TrendSign::Bearish), Some(40.0)),
            row(Some(TrendSign::Bullish), Some(rsi)),
        ]
    }

    fn signal() -> TrendRsiSignal {
        TrendRsiSignal::new(SignalConfig::default(), 2)
    }

    #[test]
    fn warmup_returns_none() {
        let sig = TrendRsiSignal::new(SignalConfig::default(), 3);
        assert_eq!(sig.evaluate(&flip_rows(50.0), &SignalContext::default()), Signal::None);
    }

    #[test]
    fn missing_fields_return_none() {
        let rows = vec![row(Some(TrendSign::Bearish), Some(40.0)), row(None, Some(50.0))];
        assert_eq!(signal().evaluate(&rows, &SignalContext::default()), Signal::None);

        let rows = vec![row(Some(TrendSign::Bearish), Some(40.0)), row(Some(TrendSign::Bullish), None)];
        assert_eq!(signal().evaluate(&rows, &SignalContext::default()), Signal::None);
    }

    #[test]
    fn flip_with_moderate_rsi_buys() {
        assert_eq!(
            signal().evaluate(&flip_rows(55.0), &SignalContext::default()),
            Signal::Buy
        );
    }

    #[test]
    fn flip_with_overbought_rsi_does_not_buy() {
        assert_eq!(
            signal().evaluate(&flip_rows(75.0), &SignalContext::default()),
            Signal::None
        );
    }

    #[test]
    fn sustained_bullish_does_not_retrigger() {
        let rows = vec![
            row(Some(TrendSign::Bullish), Some(50.0)),
            row(Some(TrendSign::Bullish), Some(50.0)),
        ];
        assert_eq!(signal().evaluate(&rows, &SignalContext::default()), Signal::None);
    }

    #[test]
    fn caller_trend_overrides_row_history() {
        let ctx = SignalContext {
            previous_trend: Some(TrendSign::Bullish),
            score: None,
        };
        assert_eq!(signal().evaluate(&flip_rows(50.0), &ctx), Signal::None);

        let rows = vec![
            row(Some(TrendSign::Bullish), Some(50.0)),
            row(Some(TrendSign::Bullish), Some(50.0)),
        ];
        let ctx = SignalContext {
            previous_trend: Some(TrendSign::Bearish),
            score: None,
        };
        assert_eq!(signal().evaluate(&rows, &ctx), Signal::Buy);
    }

    #[test]
    fn bearish_row_sells() {
        let rows = vec![
            row(Some(TrendSign::Bullish), Some(50.0)),
            row(Some(TrendSign::Bearish), Some(50.0)),
        ];
        assert_eq!(
            signal().evaluate(&rows, &SignalContext::default()),
            Signal::Sell(ExitReason::TrendReversal)
        );
    }

    #[test]
    fn rsi_breach_sells_in_uptrend() {
        let rows = vec![
            row(Some(TrendSign::Bullish), Some(70.0)),
            row(Some(TrendSign::Bullish), Some(85.0)),
        ];
        assert_eq!(
            signal().evaluate(&rows, &SignalContext::default()),
            Signal::Sell(ExitReason::RsiExit)
        );
    }

    #[test]
    fn exit_takes_precedence_over_entry() {
        // Entry threshold above the exit threshold: a flip at RSI 85 satisfies both
        let cfg = SignalConfig {
            rsi_entry_threshold: 90.0,
            ..Default::default()
        };
        let sig = TrendRsiSignal::new(cfg, 2);
        assert_eq!(
            sig.evaluate(&flip_rows(85.0), &SignalContext::default()),
            Signal::Sell(ExitReason::RsiExit)
        );
    }

    #[test]
    fn danger_score_forces_sell() {
        let ctx = SignalContext {
            previous_trend: None,
            score: Some(10.0),
        };
        assert_eq!(
            signal().evaluate(&flip_rows(50.0), &ctx),
            Signal::Sell(ExitReason::DangerScore)
        );
    }

    #[test]
    fn low_score_blocks_entry() {
        let ctx = SignalContext {
            previous_trend: None,
            score: Some(20.0),
        };
        assert_eq!(signal().evaluate(&flip_rows(50.0), &ctx), Signal::None);

        let ctx = SignalContext {
            previous_trend: None,
            score: Some(30.0),
        };
        assert_eq!(signal().evaluate(&flip_rows(50.0), &ctx), Signal::Buy);
    }

    #[test]
    fn free_function_matches_generator() {
        let cfg = SignalConfig::default();
        let ctx = SignalContext::default();
        assert_eq!(
            generate_signal(&flip_rows(50.0), &cfg, 2, &ctx),
            signal().evaluate(&flip_rows(50.0), &ctx)
        );
    }
}
