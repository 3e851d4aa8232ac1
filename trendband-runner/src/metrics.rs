//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve, drawdown curve and/or
//! trade list in, scalar out. Zero denominators yield 0.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use trendband_core::domain::Trade;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    /// Σ pnl over closed trades.
    pub net_profit: f64,
    pub final_equity: f64,
    /// net_profit / initial capital.
    pub total_return: f64,
    /// Largest peak-to-trough fall, in currency.
    pub max_drawdown: f64,
    /// Largest fall as a fraction of the peak it fell from.
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
    pub avg_holding_secs: f64,
    pub avg_return_pct: f64,
    pub profit_factor: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from the curves and the trade ledger.
    pub fn compute(
        equity_curve: &[f64],
        drawdown_curve: &[f64],
        trades: &[Trade],
        initial_capital: f64,
    ) -> Self {
        let net = net_profit(trades);
        Self {
            trade_count: trades.len(),
            net_profit: net,
            final_equity: equity_curve.last().copied().unwrap_or(initial_capital),
            total_return: if initial_capital > 0.0 {
                net / initial_capital
            } else {
                0.0
            },
            max_drawdown: max_drawdown(drawdown_curve),
            max_drawdown_pct: max_drawdown_pct(equity_curve),
            win_rate: win_rate(trades),
            avg_holding_secs: avg_holding_secs(trades),
            avg_return_pct: avg_return_pct(trades),
            profit_factor: profit_factor(trades),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
        }
    }
}

/// Trades grouped by the calendar month they closed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPerformance {
    /// `YYYY-MM`
    pub month: String,
    pub trade_count: usize,
    pub net_profit: f64,
    pub win_rate: f64,
}

// ─── Individual metric functions ────────────────────────────────────

pub fn net_profit(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.pnl).sum()
}

/// Largest value of the drawdown curve.
pub fn max_drawdown(drawdown_curve: &[f64]) -> f64 {
    drawdown_curve.iter().copied().fold(0.0, f64::max)
}

/// Largest drawdown relative to the running peak, as a fraction.
pub fn max_drawdown_pct(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            worst = worst.max((peak - eq) / peak);
        }
    }
    worst
}

/// Fraction of trades with positive pnl.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

pub fn avg_holding_secs(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let total: i64 = trades.iter().map(|t| t.holding().num_seconds()).sum();
    total as f64 / trades.len() as f64
}

pub fn avg_return_pct(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.return_pct()).sum::<f64>() / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

/// Per-month summary, ordered by month.
pub fn monthly_breakdown(trades: &[Trade]) -> Vec<MonthlyPerformance> {
    let mut by_month: BTreeMap<(i32, u32), Vec<&Trade>> = BTreeMap::new();
    for trade in trades {
        let key = (trade.exit_time.year(), trade.exit_time.month());
        by_month.entry(key).or_default().push(trade);
    }

    by_month
        .into_iter()
        .map(|((year, month), group)| {
            let winners = group.iter().filter(|t| t.is_winner()).count();
            MonthlyPerformance {
                month: format!("{year:04}-{month:02}"),
                trade_count: group.len(),
                net_profit: group.iter().map(|t| t.pnl).sum(),
                win_rate: winners as f64 / group.len() as f64,
            }
        })
        .collect()
}
