use serde::{Deserialize, Serialize};

use super::moving_average::sma;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// SMA +/- `multiplier` population standard deviations over `period` values.
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> Vec<Option<Bands>> {
    sma(closes, period)
        .into_iter()
        .enumerate()
        .map(|(i, mean)| {
            let mean = mean?;
            let window = &closes[i + 1 - period..=i];
            let variance =
                window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
            let std_dev = variance.sqrt();
            Some(Bands {
                upper: mean + multiplier * std_dev,
                middle: mean,
                lower: mean - multiplier * std_dev,
            })
        })
        .collect()
}

/// True range per bar. Index 0 has no previous close and is `None`.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<Option<f64>> {
    let n = closes.len().min(highs.len()).min(lows.len());
    let mut out = vec![None; closes.len()];
    for i in 1..n {
        let prev_close = closes[i - 1];
        let tr = (highs[i] - lows[i])
            .max((highs[i] - prev_close).abs())
            .max((lows[i] - prev_close).abs());
        out[i] = Some(tr);
    }
    out
}

/// Wilder ATR. The first value is the SMA of the first `period` true ranges.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let tr = true_range(highs, lows, closes);
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let p = period as f64;
    let mut prev = tr[1..=period].iter().flatten().sum::<f64>() / p;
    out[period] = Some(prev);
    for i in (period + 1)..closes.len() {
        if let Some(range) = tr[i] {
            prev = (prev * (p - 1.0) + range) / p;
            out[i] = Some(prev);
        }
    }
    out
}
