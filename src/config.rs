use chrono_tz::Tz;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::Timeframe;
use crate::signals::thresholds::Revision;

#[derive(Debug, Clone)]
pub struct Config {
    // Pricing
    pub risk_free_rate: f64,
    pub default_volatility: f64,

    // Strategy selection (IV in percent, strikes in price units)
    pub iv_baseline: f64,
    pub strike_step: f64,

    // Signal engine
    pub timeframe_weights: HashMap<Timeframe, f64>,
    pub threshold_revision: Revision,

    // Position risk
    pub default_lot_size: u32,
    /// Symbol prefix -> contract lot size. Matched longest prefix first.
    pub lot_sizes: Vec<(String, u32)>,
    pub greeks_cache_ttl: Duration,

    // Exchange calendar, as (hour, minute) in `market_tz`
    pub market_tz: Tz,
    pub market_open: (u32, u32),
    pub market_close: (u32, u32),

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let timeframe_weights = HashMap::from([
            (Timeframe::Month1, 0.05),
            (Timeframe::Week1, 0.15),
            (Timeframe::Day1, 0.35),
            (Timeframe::Hour3, 0.25),
            (Timeframe::Hour1, 0.20),
        ]);

        let lot_sizes = vec![
            ("NATGASMINI".to_string(), 250),
            ("NATGAS".to_string(), 1250),
            ("CRUDEOILM".to_string(), 10),
            ("CRUDEOIL".to_string(), 100),
        ];

        Config {
            risk_free_rate: 0.07,
            default_volatility: 0.60,
            iv_baseline: 42.0,
            strike_step: 5.0,
            timeframe_weights,
            threshold_revision: Revision::Current,
            default_lot_size: 1250,
            lot_sizes,
            greeks_cache_ttl: Duration::from_secs(60),
            market_tz: chrono_tz::Asia::Kolkata,
            market_open: (9, 0),
            market_close: (23, 30),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str| std::env::var(key).ok();
        let defaults = Config::default();

        let threshold_revision = env("THRESHOLD_REVISION")
            .and_then(|s| Revision::from_str_loose(&s))
            .unwrap_or(defaults.threshold_revision);

        let market_tz = env("MARKET_TZ")
            .and_then(|s| s.parse::<Tz>().ok())
            .unwrap_or(defaults.market_tz);

        Config {
            risk_free_rate: env("RISK_FREE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.risk_free_rate),
            default_volatility: env("DEFAULT_VOLATILITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_volatility),
            iv_baseline: env("IV_BASELINE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.iv_baseline),
            strike_step: env("STRIKE_STEP")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.strike_step),
            timeframe_weights: env("TIMEFRAME_WEIGHTS")
                .and_then(|s| parse_weights(&s))
                .unwrap_or(defaults.timeframe_weights.clone()),
            threshold_revision,
            default_lot_size: env("DEFAULT_LOT_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_lot_size),
            greeks_cache_ttl: env("GREEKS_CACHE_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.greeks_cache_ttl),
            market_tz,
            market_open: env("MARKET_OPEN_HOUR")
                .and_then(|s| s.parse().ok())
                .map(|h| (h, 0))
                .unwrap_or(defaults.market_open),
            log_level: env("LOG_LEVEL").unwrap_or(defaults.log_level.clone()),
            ..defaults
        }
    }

    /// Rejects malformed weight tables and non-positive numeric parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeframe_weights.is_empty() {
            return Err(ConfigError::EmptyWeightTable);
        }
        for tf in Timeframe::ALL {
            if let Some(&weight) = self.timeframe_weights.get(&tf) {
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(ConfigError::InvalidWeight {
                        timeframe: tf,
                        weight,
                    });
                }
            }
        }

        let positive = [
            ("risk_free_rate", self.risk_free_rate),
            ("default_volatility", self.default_volatility),
            ("iv_baseline", self.iv_baseline),
            ("strike_step", self.strike_step),
            ("default_lot_size", self.default_lot_size as f64),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }

        let minutes = |(h, m): (u32, u32)| h * 60 + m;
        if self.market_open.0 > 23
            || self.market_close.0 > 23
            || minutes(self.market_open) >= minutes(self.market_close)
        {
            return Err(ConfigError::InvalidSession {
                open: self.market_open,
                close: self.market_close,
            });
        }

        Ok(())
    }
}

/// Parses `1D=0.4,3H=0.3,...`. Any malformed entry rejects the whole table.
fn parse_weights(raw: &str) -> Option<HashMap<Timeframe, f64>> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            let (tf, weight) = entry.split_once('=')?;
            Some((Timeframe::from_str_loose(tf)?, weight.trim().parse().ok()?))
        })
        .collect()
}
