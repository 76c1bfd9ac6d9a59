//! Black-Scholes Greeks for a single option leg.
//!
//! Theta is daily decay (annual / 365); vega and rho are per 1% move in IV and rate.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::Config;
use crate::models::OptionType;
use crate::util::round4;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksInput {
    pub spot: f64,
    pub strike: f64,
    /// Years until expiry. Zero or negative means expired or expiring today.
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    /// Annualized volatility as a fraction (0.60 = 60%).
    pub volatility: f64,
    pub option_type: OptionType,
}

impl GreeksInput {
    /// Input using the configured default rate and volatility.
    pub fn with_defaults(
        cfg: &Config,
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        option_type: OptionType,
    ) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry,
            risk_free_rate: cfg.risk_free_rate,
            volatility: cfg.default_volatility,
            option_type,
        }
    }

    /// Replace the volatility with a caller-supplied IV when one is present and sane.
    pub fn with_iv(mut self, iv: Option<f64>) -> Self {
        if let Some(iv) = iv.filter(|v| v.is_finite() && *v > 0.0) {
            self.volatility = iv;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

/// Abramowitz & Stegun 26.2.17 approximation of the standard normal CDF.
pub fn norm_cdf(x: f64) -> f64 {
    const B1: f64 = 0.319_381_530;
    const B2: f64 = -0.356_563_782;
    const B3: f64 = 1.781_477_937;
    const B4: f64 = -1.821_255_978;
    const B5: f64 = 1.330_274_429;
    const P: f64 = 0.231_641_9;

    let t = 1.0 / (1.0 + P * x.abs());
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    let upper_tail = norm_pdf(x) * poly;
    if x >= 0.0 {
        1.0 - upper_tail
    } else {
        upper_tail
    }
}

pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

pub fn black_scholes(input: &GreeksInput) -> Greeks {
    let GreeksInput {
        spot: s,
        strike: k,
        time_to_expiry: t,
        risk_free_rate: r,
        volatility: sigma,
        option_type,
    } = *input;

    if t <= 0.0 {
        return at_expiry(s, k, option_type);
    }
    if s <= 0.0 || k <= 0.0 || sigma <= 0.0 {
        return Greeks::default();
    }

    let sqrt_t = t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;
    let pdf_d1 = norm_pdf(d1);
    let discount = (-r * t).exp();

    let gamma = pdf_d1 / (s * sigma * sqrt_t);
    let vega = s * pdf_d1 * sqrt_t / 100.0;
    let decay = -s * pdf_d1 * sigma / (2.0 * sqrt_t);

    let (delta, theta_annual, rho) = match option_type {
        OptionType::Call => (
            norm_cdf(d1),
            decay - r * k * discount * norm_cdf(d2),
            k * t * discount * norm_cdf(d2) / 100.0,
        ),
        OptionType::Put => (
            norm_cdf(d1) - 1.0,
            decay + r * k * discount * norm_cdf(-d2),
            -k * t * discount * norm_cdf(-d2) / 100.0,
        ),
    };

    Greeks {
        delta: round4(delta),
        gamma: round4(gamma),
        theta: round4(theta_annual / 365.0),
        vega: round4(vega),
        rho: round4(rho),
    }
}

fn at_expiry(spot: f64, strike: f64, option_type: OptionType) -> Greeks {
    let delta = match option_type {
        OptionType::Call if spot > strike => 1.0,
        OptionType::Put if spot < strike => -1.0,
        _ => 0.0,
    };
    Greeks {
        delta,
        ..Greeks::default()
    }
}

/// Years from `now` until the exchange close on `expiry` in `tz`. Zero once the
/// expiry day has begun in `tz`, so expiring contracts price at intrinsic.
pub fn time_to_expiry_years(
    expiry: NaiveDate,
    now: DateTime<Utc>,
    tz: Tz,
    close: (u32, u32),
) -> f64 {
    if expiry <= now.with_timezone(&tz).date_naive() {
        return 0.0;
    }
    let close_time = NaiveTime::from_hms_opt(close.0, close.1, 0).unwrap_or(NaiveTime::MIN);
    let expiry_close = match tz.from_local_datetime(&expiry.and_time(close_time)).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => return 0.0,
    };
    (expiry_close - now).num_seconds() as f64 / SECONDS_PER_YEAR
}
