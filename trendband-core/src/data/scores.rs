//! External score series (e.g. a market sentiment index) and alignment to candles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// One observation from an external scoring collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
}

/// As-of join: for each candle, the latest score stamped at or before it.
///
/// `points` must be sorted by timestamp. Candles before the first point, and
/// non-finite scores, yield `None` (no gating).
pub fn align_scores(candles: &[Candle], points: &[ScorePoint]) -> Vec<Option<f64>> {
    let mut aligned = Vec::with_capacity(candles.len());
    let mut next = 0;
    let mut current: Option<f64> = None;

    for candle in candles {
        while next < points.len() && points[next].timestamp <= candle.timestamp {
            let score = points[next].score;
            current = score.is_finite().then_some(score);
            next += 1;
        }
        aligned.push(current);
    }
    aligned
}
