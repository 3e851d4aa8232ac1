//! Trend direction and discrete trade signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the trailing trend band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSign {
    /// Price rides the lower band (+1).
    Bullish,
    /// Price rides the upper band (-1).
    Bearish,
}

impl TrendSign {
    pub fn as_i8(self) -> i8 {
        match self {
            TrendSign::Bullish => 1,
            TrendSign::Bearish => -1,
        }
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, TrendSign::Bullish)
    }
}

/// Why a sell signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The trend band is bearish.
    TrendReversal,
    /// RSI rose above the exit threshold.
    RsiExit,
    /// The external score fell below the danger threshold. Forced exit.
    DangerScore,
}

impl ExitReason {
    /// Forced exits bypass the profitability gate.
    pub fn is_forced(self) -> bool {
        matches!(self, ExitReason::DangerScore)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::TrendReversal => "trend_reversal",
            ExitReason::RsiExit => "rsi_exit",
            ExitReason::DangerScore => "danger_score",
        }
    }
}

/// Output of the signal state machine for one closed candle.
///
/// Signals describe what the market data says, never what the portfolio
/// holds. A `Sell` while flat is simply ignored by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell(ExitReason),
    #[default]
    None,
}

impl Signal {
    pub fn is_none(&self) -> bool {
        matches!(self, Signal::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell(_) => "sell",
            Signal::None => "none",
        }
    }
}

/// A signal tied to the candle that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
}
