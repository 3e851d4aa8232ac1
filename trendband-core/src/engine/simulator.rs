//! Candle-by-candle backtest over a single symbol.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ExitPolicy, StrategyConfig};
use crate::data::{validate_series, SeriesError};
use crate::domain::{Candle, Position, Signal, SignalEvent, TickEvent, Trade};
use crate::engine::curves::{drawdown_curve, equity_curve};
use crate::engine::state::SimulationState;
use crate::indicators::compute_indicators;
use crate::signal::{SignalContext, SignalGenerator, TrendRsiSignal};

/// Why a simulation refused to start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub symbol: String,
    pub trades: Vec<Trade>,
    pub ticks: Vec<TickEvent>,
    /// initial capital, then one point per realized trade.
    pub equity_curve: Vec<f64>,
    /// Aligned one-to-one with `equity_curve`.
    pub drawdown_curve: Vec<f64>,
    /// Position still open when the data ran out.
    pub open_position: Option<Position>,
    pub final_capital: f64,
    /// Every non-`None` signal, executed or not.
    pub signals: Vec<SignalEvent>,
    pub candle_count: usize,
    pub warmup_bars: usize,
    pub warnings: Vec<String>,
}

/// Drives a signal generator over a candle series and keeps the books.
///
/// Holds configuration only; every `run` builds its own `SimulationState`.
pub struct Simulator {
    config: StrategyConfig,
    signal: Box<dyn SignalGenerator>,
}

impl Simulator {
    /// A simulator using the trend/RSI signal configured in `config`.
    ///
    /// Rejects an invalid configuration before any candle is touched.
    pub fn new(config: StrategyConfig) -> Result<Self, ConfigError> {
        let warmup = config.indicators.warmup();
        let signal = TrendRsiSignal::new(config.signal.clone(), warmup);
        Self::with_signal(config, Box::new(signal))
    }

    /// A simulator with a custom signal generator.
    pub fn with_signal(
        config: StrategyConfig,
        signal: Box<dyn SignalGenerator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, signal })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Replay `candles` in order, evaluating one signal per closed candle.
    ///
    /// `scores` is aligned to `candles` by index; missing entries mean no
    /// score for that step. Short input is not an error: the outcome simply
    /// has no trades and carries a warning. Unsorted, duplicated or void
    /// candles are.
    pub fn run(
        &self,
        symbol: &str,
        candles: &[Candle],
        scores: &[Option<f64>],
    ) -> Result<SimulationOutcome, SeriesError> {
        validate_series(candles)?;
        let sim = &self.config.simulation;
        let warmup = self.signal.warmup_bars();
        let mut state = SimulationState::new(sim.initial_capital);
        let mut signals = Vec::new();
        let mut warnings = Vec::new();

        info!(symbol, candles = candles.len(), warmup, "simulation start");

        if candles.len() < warmup {
            let msg = format!(
                "{symbol}: {} candles is shorter than the {warmup}-candle warm-up; no trades possible",
                candles.len()
            );
            warn!("{msg}");
            warnings.push(msg);
        } else {
            let rows = compute_indicators(candles, &self.config.indicators);

            for (i, row) in rows.iter().enumerate() {
                let ctx = SignalContext {
                    previous_trend: state.previous_trend,
                    score: scores.get(i).copied().flatten(),
                };
                let signal = self.signal.evaluate(&rows[..=i], &ctx);
                state.previous_trend = row.trend_sign;

                if !signal.is_none() {
                    signals.push(SignalEvent {
                        index: i,
                        timestamp: row.candle.timestamp,
                        signal,
                    });
                }

                match signal {
                    Signal::Buy => {
                        state.open(&row.candle, i, sim.fee_rate);
                    }
                    Signal::Sell(reason) => {
                        let Some(position) = state.position else {
                            continue;
                        };
                        let price = row.candle.close;
                        let gated = !reason.is_forced()
                            && sim.exit_policy == ExitPolicy::ProfitableOnly
                            && price <= position.entry_price;
                        if gated {
                            debug!(
                                index = i,
                                price,
                                entry_price = position.entry_price,
                                reason = reason.as_str(),
                                "exit suppressed while underwater"
                            );
                            continue;
                        }
                        state.close(symbol, &row.candle, i, sim.fee_rate, reason);
                    }
                    Signal::None => {}
                }
            }

            if state.trade_ledger.is_empty() && state.position.is_none() {
                debug!(symbol, "run completed without trades");
            }
        }

        let equity = equity_curve(sim.initial_capital, &state.trade_ledger);
        let drawdown = drawdown_curve(&equity);

        info!(
            symbol,
            trades = state.trade_ledger.len(),
            open = state.position.is_some(),
            final_equity = equity.last().copied().unwrap_or(sim.initial_capital),
            "simulation finished"
        );

        Ok(SimulationOutcome {
            symbol: symbol.to_string(),
            trades: state.trade_ledger,
            ticks: state.tick_log,
            equity_curve: equity,
            drawdown_curve: drawdown,
            open_position: state.position,
            final_capital: state.capital,
            signals,
            candle_count: candles.len(),
            warmup_bars: warmup,
            warnings,
        })
    }
}

/// One-shot convenience wrapper around `Simulator::new(config).run(..)`.
pub fn run_simulation(
    symbol: &str,
    candles: &[Candle],
    scores: &[Option<f64>],
    config: &StrategyConfig,
) -> Result<SimulationOutcome, SimulationError> {
    Ok(Simulator::new(config.clone())?.run(symbol, candles, scores)?)
}
