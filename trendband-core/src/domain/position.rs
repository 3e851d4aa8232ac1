use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single open long position of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_time: DateTime<Utc>,
    pub entry_index: usize,
    pub entry_price: f64,
    pub quantity: f64,
    /// Fee paid when the position was opened.
    pub entry_fee: f64,
}

impl Position {
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.entry_price)
    }

    pub fn is_underwater(&self, current_price: f64) -> bool {
        current_price <= self.entry_price
    }
}
