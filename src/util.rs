/// Round to `dp` decimal places, mapping non-finite input to 0.
pub fn round_to(value: f64, dp: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}

/// Percent change from `from` to `to`; 0 when `from` is zero.
pub fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round4(1.23456), 1.2346);
        assert_eq!(round2(f64::NAN), 0.0);
    }

    #[test]
    fn pct_change_guards_zero() {
        assert_eq!(pct_change(0.0, 5.0), 0.0);
        assert!((pct_change(100.0, 103.0) - 3.0).abs() < 1e-9);
    }
}
