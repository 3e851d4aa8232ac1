//! Domain types for trendband

pub mod candle;
pub mod indicator_row;
pub mod position;
pub mod signal;
pub mod trade;

pub use candle::Candle;
pub use indicator_row::IndicatorRow;
pub use position::Position;
pub use signal::{ExitReason, Signal, SignalEvent, TrendSign};
pub use trade::{TickEvent, TickKind, Trade};
