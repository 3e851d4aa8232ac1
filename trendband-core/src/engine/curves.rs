//! Equity and drawdown curves over realized trades.

use crate::domain::Trade;

/// equity[0] = initial capital; equity[i] = equity[i-1] + pnl of trade i.
///
/// One point per trade plus the starting point.
pub fn equity_curve(initial_capital: f64, trades: &[Trade]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    let mut equity = initial_capital;
    curve.push(equity);
    for trade in trades {
        equity += trade.pnl;
        curve.push(equity);
    }
    curve
}

/// drawdown[i] = max(equity[0..=i]) - equity[i], in currency units. Never negative.
pub fn drawdown_curve(equity_curve: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|&eq| {
            peak = peak.max(eq);
            (peak - eq).max(0.0)
        })
        .collect()
}
