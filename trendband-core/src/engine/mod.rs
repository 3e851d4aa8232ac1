//! Backtest simulator: a single pass over closed candles, one signal
//! evaluation per step, a flat/long state machine with fees, and the
//! resulting trade ledger, tick log, equity and drawdown curves.

pub mod curves;
pub mod simulator;
pub mod state;

pub use curves::{drawdown_curve, equity_curve};
pub use simulator::{run_simulation, SimulationError, SimulationOutcome, Simulator};
pub use state::SimulationState;
