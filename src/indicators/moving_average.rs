/// Simple moving average. Index `i` is `None` until `period` values are available.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period` values,
/// then `ema = prev + k * (value - prev)` with `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for i in period..values.len() {
        prev += k * (values[i] - prev);
        out[i] = Some(prev);
    }
    out
}

/// EMA over the defined entries of a sparse series, realigned to the original indices.
pub fn ema_of_defined(series: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let (indices, values): (Vec<usize>, Vec<f64>) = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .unzip();

    let mut out = vec![None; series.len()];
    for (idx, value) in indices.into_iter().zip(ema(&values, period)) {
        out[idx] = value;
    }
    out
}

/// SMA over the defined entries of a sparse series, realigned to the original indices.
pub fn sma_of_defined(series: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let (indices, values): (Vec<usize>, Vec<f64>) = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .unzip();

    let mut out = vec![None; series.len()];
    for (idx, value) in indices.into_iter().zip(sma(&values, period)) {
        out[idx] = value;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_basic() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!((out[2].unwrap() - 2.0).abs() < 1e-9);
        assert!((out[4].unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn sma_insufficient_and_zero_period() {
        assert!(sma(&[1.0, 2.0], 3).iter().all(Option::is_none));
        assert!(sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn ema_seeded_by_sma() {
        let out = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        // seed = 4.0, k = 0.5 -> 4 + 0.5 * (8 - 4) = 6
        assert!((out[2].unwrap() - 4.0).abs() < 1e-9);
        assert!((out[3].unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn ema_of_defined_realigns() {
        let sparse = vec![None, None, Some(1.0), Some(2.0), Some(3.0)];
        let out = ema_of_defined(&sparse, 2);
        assert_eq!(out[2], None);
        assert!((out[3].unwrap() - 1.5).abs() < 1e-9);
        assert!(out[4].is_some());
    }
}
