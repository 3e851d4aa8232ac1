//! Mutable state owned by one simulation run.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Candle, ExitReason, Position, TickEvent, TickKind, TrendSign, Trade};

/// Capital account, open position, ledger and tick log of one run.
///
/// Never shared between runs; concurrent simulations each own one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    /// Free cash. The entry notional and fees leave it; exit proceeds return.
    pub capital: f64,
    pub position: Option<Position>,
    pub trade_ledger: Vec<Trade>,
    pub tick_log: Vec<TickEvent>,
    /// Trend sign of the previous closed row, fed back to the signal machine.
    pub previous_trend: Option<TrendSign>,
}

impl SimulationState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            position: None,
            trade_ledger: Vec::new(),
            tick_log: Vec::new(),
            previous_trend: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// flat → long: spend all capital, net of the fee, at `candle.close`.
    ///
    /// Returns false (and changes nothing) if a position is already open or
    /// there is nothing to buy with.
    pub fn open(&mut self, candle: &Candle, index: usize, fee_rate: f64) -> bool {
        let price = candle.close;
        if self.position.is_some() || self.capital <= 0.0 || price <= 0.0 {
            return false;
        }

        let fee = self.capital * fee_rate;
        let notional = self.capital - fee;
        let quantity = notional / price;
        if quantity <= 0.0 {
            return false;
        }

        self.capital = (self.capital - fee - notional).max(0.0);
        self.position = Some(Position {
            entry_time: candle.timestamp,
            entry_index: index,
            entry_price: price,
            quantity,
            entry_fee: fee,
        });
        self.tick_log.push(TickEvent {
            timestamp: candle.timestamp,
            price,
            kind: TickKind::Entry,
        });
        debug!(timestamp = %candle.timestamp, price, quantity, fee, "entry");
        true
    }

    /// long → flat at `candle.close`. Returns the closed trade, if any.
    pub fn close(
        &mut self,
        symbol: &str,
        candle: &Candle,
        index: usize,
        fee_rate: f64,
        reason: ExitReason,
    ) -> Option<&Trade> {
        let position = self.position.take()?;
        let price = candle.close;

        let gross = position.quantity * price;
        let exit_fee = gross * fee_rate;
        let proceeds = gross - exit_fee;
        let pnl = proceeds - position.quantity * position.entry_price;
        self.capital += proceeds;

        self.tick_log.push(TickEvent {
            timestamp: candle.timestamp,
            price,
            kind: TickKind::Exit,
        });
        debug!(timestamp = %candle.timestamp, price, pnl, reason = reason.as_str(), "exit");

        self.trade_ledger.push(Trade {
            symbol: symbol.to_string(),
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time: candle.timestamp,
            exit_price: price,
            exit_reason: reason,
            quantity: position.quantity,
            pnl,
            entry_fee: position.entry_fee,
            exit_fee,
            bars_held: index.saturating_sub(position.entry_index),
        });
        self.trade_ledger.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_candles;
    use crate::indicators::assert_approx;

    #[test]
    fn open_spends_capital_net_of_fee() {
        let candles = test_candles(&[100.0]);
        let mut state = SimulationState::new(10_000.0);
        assert!(state.open(&candles[0], 0, 0.005));

        let pos = state.position.unwrap();
        assert_approx(pos.quantity, 9_950.0 / 100.0, 1e-9);
        assert_approx(pos.entry_fee, 50.0, 1e-9);
        assert_approx(state.capital, 0.0, 1e-9);
        assert_eq!(state.tick_log.len(), 1);
        assert_eq!(state.tick_log[0].kind, TickKind::Entry);
    }

    #[test]
    fn second_open_is_refused() {
        let candles = test_candles(&[100.0, 101.0]);
        let mut state = SimulationState::new(10_000.0);
        assert!(state.open(&candles[0], 0, 0.005));
        assert!(!state.open(&candles[1], 1, 0.005));
        assert_eq!(state.position.unwrap().entry_price, 100.0);
        assert_eq!(state.tick_log.len(), 1);
    }

    #[test]
    fn close_realizes_pnl() {
        let candles = test_candles(&[100.0, 110.0]);
        let mut state = SimulationState::new(10_000.0);
        state.open(&candles[0], 0, 0.005);

        let trade = state
            .close("BTC/USD", &candles[1], 1, 0.005, ExitReason::TrendReversal)
            .cloned()
            .unwrap();

        // qty = 99.5; proceeds = 99.5 * 110 * 0.995; pnl = proceeds - 99.5 * 100
        let proceeds = 99.5 * 110.0 * 0.995;
        assert_approx(trade.pnl, proceeds - 9_950.0, 1e-6);
        assert_approx(state.capital, proceeds, 1e-6);
        assert_eq!(trade.bars_held, 1);
        assert!(trade.exit_time > trade.entry_time);
        assert!(state.is_flat());
        assert_eq!(state.tick_log.len(), 2);
    }

    #[test]
    fn close_while_flat_is_noop() {
        let candles = test_candles(&[100.0]);
        let mut state = SimulationState::new(10_000.0);
        assert!(state
            .close("X", &candles[0], 0, 0.005, ExitReason::RsiExit)
            .is_none());
        assert!(state.trade_ledger.is_empty());
        assert!(state.tick_log.is_empty());
    }
}
