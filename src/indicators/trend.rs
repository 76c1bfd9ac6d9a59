#[derive(Debug, Clone, Default)]
pub struct AdxSeries {
    pub adx: Vec<Option<f64>>,
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
}

/// Wilder ADX with +DI / -DI.
///
/// Directional movement and true range are Wilder-smoothed from bar 1. DI values start
/// at index `period`; ADX starts as the SMA of the first `period` DX values (index
/// `2 * period - 1`) and is Wilder-smoothed afterwards.
pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> AdxSeries {
    let len = closes.len();
    let n = len.min(highs.len()).min(lows.len());
    let mut out = AdxSeries {
        adx: vec![None; len],
        plus_di: vec![None; len],
        minus_di: vec![None; len],
    };
    if period == 0 || n <= period {
        return out;
    }

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    let mut tr = vec![0.0; n];
    for i in 1..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        tr[i] = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());
    }

    let p = period as f64;
    let mut sm_plus: f64 = plus_dm[1..=period].iter().sum();
    let mut sm_minus: f64 = minus_dm[1..=period].iter().sum();
    let mut sm_tr: f64 = tr[1..=period].iter().sum();

    let mut dx_values: Vec<(usize, f64)> = Vec::with_capacity(n);
    for i in period..n {
        if i > period {
            sm_plus = sm_plus - sm_plus / p + plus_dm[i];
            sm_minus = sm_minus - sm_minus / p + minus_dm[i];
            sm_tr = sm_tr - sm_tr / p + tr[i];
        }

        let (pdi, mdi) = if sm_tr > 0.0 {
            (100.0 * sm_plus / sm_tr, 100.0 * sm_minus / sm_tr)
        } else {
            (0.0, 0.0)
        };
        out.plus_di[i] = Some(pdi);
        out.minus_di[i] = Some(mdi);

        let di_sum = pdi + mdi;
        let dx = if di_sum > 0.0 {
            (pdi - mdi).abs() / di_sum * 100.0
        } else {
            0.0
        };
        dx_values.push((i, dx));
    }

    if dx_values.len() < period {
        return out;
    }
    let mut adx_prev = dx_values[..period].iter().map(|(_, dx)| dx).sum::<f64>() / p;
    out.adx[dx_values[period - 1].0] = Some(adx_prev);
    for &(i, dx) in &dx_values[period..] {
        adx_prev = (adx_prev * (p - 1.0) + dx) / p;
        out.adx[i] = Some(adx_prev);
    }

    out
}
