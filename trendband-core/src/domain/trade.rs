//! Trade: a completed round trip, and the tick events that mark it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::signal::ExitReason;

/// A closed round-trip trade: entry → exit.
///
/// Immutable once appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,

    // ── Entry ──
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: f64,

    // ── PnL ──
    /// Exit proceeds (net of the exit fee) minus the entry notional.
    pub pnl: f64,
    pub entry_fee: f64,
    pub exit_fee: f64,

    // ── Duration ──
    pub bars_held: usize,
}

impl Trade {
    /// Time between entry and exit.
    pub fn holding(&self) -> Duration {
        self.exit_time - self.entry_time
    }

    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

/// Kind of a tick log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Entry,
    Exit,
}

impl TickKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TickKind::Entry => "entry",
            TickKind::Exit => "exit",
        }
    }
}

/// One executed transition, for plotting collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub kind: TickKind,
}
