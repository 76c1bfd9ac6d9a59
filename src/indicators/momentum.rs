use super::moving_average::{ema, ema_of_defined, sma_of_defined};

/// Wilder RSI. Averages are seeded from the first `period` deltas; an average loss of
/// zero yields 100.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss -= delta;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    let p = period as f64;
    for i in (period + 1)..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let macd: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal = ema_of_defined(&macd, signal_period);
    let histogram = macd
        .iter()
        .zip(&signal)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        macd,
        signal,
        histogram,
    }
}

#[derive(Debug, Clone, Default)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// %K over `k_period` highs/lows; a zero-range window reads 50. %D is the SMA of %K.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticSeries {
    let n = closes.len().min(highs.len()).min(lows.len());
    let mut k = vec![None; closes.len()];
    if k_period > 0 && n >= k_period {
        for i in (k_period - 1)..n {
            let window = (i + 1 - k_period)..=i;
            let high = highs[window.clone()]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let low = lows[window].iter().copied().fold(f64::INFINITY, f64::min);
            let range = high - low;
            let value = if range == 0.0 {
                50.0
            } else {
                ((closes[i] - low) / range * 100.0).clamp(0.0, 100.0)
            };
            k[i] = Some(value);
        }
    }

    let d = sma_of_defined(&k, d_period);
    StochasticSeries { k, d }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_insufficient_history() {
        let closes: Vec<f64> = (0..14).map(|i| i as f64).collect();
        assert!(rsi(&closes, 14).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_monotonic_rise_caps_at_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&closes, 14);
        let last = out.last().copied().flatten().unwrap();
        assert!(last <= 100.0);
        assert!(last > 99.0);
        assert!(out.iter().flatten().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let last = rsi(&closes, 14).last().copied().flatten().unwrap();
        assert!(last.abs() < 1e-9);
    }

    #[test]
    fn rsi_bounded_on_choppy_series() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i as f64) * 0.9).sin() * 5.0)
            .collect();
        assert!(rsi(&closes, 14).iter().flatten().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn macd_flat_prices_zero() {
        let closes = vec![50.0; 60];
        let out = macd(&closes, 12, 26, 9);
        let hist = out.histogram.last().copied().flatten().unwrap();
        assert!(hist.abs() < 1e-9);
    }

    #[test]
    fn macd_signal_starts_after_slow_plus_signal() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let out = macd(&closes, 12, 26, 9);
        // first MACD value at index 25, first signal 8 values later
        assert!(out.macd[24].is_none());
        assert!(out.macd[25].is_some());
        assert!(out.signal[32].is_none());
        assert!(out.signal[33].is_some());
    }

    #[test]
    fn macd_short_series_absent() {
        let closes = vec![1.0; 20];
        let out = macd(&closes, 12, 26, 9);
        assert!(out.macd.iter().all(Option::is_none));
        assert!(out.histogram.iter().all(Option::is_none));
    }

    #[test]
    fn stochastic_zero_range_is_fifty() {
        let flat = vec![10.0; 20];
        let out = stochastic(&flat, &flat, &flat, 14, 3);
        assert_eq!(out.k.last().copied().flatten(), Some(50.0));
        assert_eq!(out.d.last().copied().flatten(), Some(50.0));
    }

    #[test]
    fn stochastic_bounds() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).cos() * 4.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let out = stochastic(&highs, &lows, &closes, 14, 3);
        assert!(out.k.iter().flatten().all(|v| (0.0..=100.0).contains(v)));
        assert!(out.d.iter().flatten().all(|v| (0.0..=100.0).contains(v)));
        assert!(out.k[12].is_none());
        assert!(out.d[14].is_none());
        assert!(out.d[15].is_some());
    }
}
