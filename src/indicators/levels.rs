use serde::{Deserialize, Serialize};

use crate::models::Candle;

pub const FIB_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Cumulative (typical price * volume) / cumulative volume. `None` while no volume
/// has traded.
pub fn vwap(candles: &[Candle]) -> Vec<Option<f64>> {
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    candles
        .iter()
        .map(|c| {
            cum_pv += c.typical_price() * c.volume;
            cum_vol += c.volume;
            (cum_vol > 0.0).then(|| cum_pv / cum_vol)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub r3: f64,
    pub s1: f64,
    pub s2: f64,
    pub s3: f64,
}

impl PivotLevels {
    /// Pivot and every support/resistance level.
    pub fn all(&self) -> [f64; 7] {
        [
            self.s3, self.s2, self.s1, self.pivot, self.r1, self.r2, self.r3,
        ]
    }
}

/// Classic floor pivots from one candle's high, low and close.
pub fn pivot_points(high: f64, low: f64, close: f64) -> PivotLevels {
    let pivot = (high + low + close) / 3.0;
    let range = high - low;
    PivotLevels {
        pivot,
        r1: 2.0 * pivot - low,
        r2: pivot + range,
        r3: high + 2.0 * (pivot - low),
        s1: 2.0 * pivot - high,
        s2: pivot - range,
        s3: low - 2.0 * (high - pivot),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Retracement levels measured down from `high` toward `low`.
pub fn fibonacci_retracement(high: f64, low: f64) -> Vec<FibLevel> {
    let range = high - low;
    FIB_RATIOS
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: high - range * ratio,
        })
        .collect()
}
