use serde::{Deserialize, Serialize};

use crate::util::round2;

/// Neutral put-call ratio assumed when no chain is available.
pub const BASELINE_PCR: f64 = 1.0;
/// Distance of synthetic support/resistance from spot, in ATRs.
pub const SYNTHETIC_ATR_MULTIPLE: f64 = 2.0;

/// One strike of an option chain. IVs are in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainRow {
    pub strike: f64,
    pub call_oi: f64,
    pub put_oi: f64,
    pub call_iv: Option<f64>,
    pub put_iv: Option<f64>,
}

impl ChainRow {
    fn mid_iv(&self) -> Option<f64> {
        match (self.call_iv.filter(|v| *v > 0.0), self.put_iv.filter(|v| *v > 0.0)) {
            (Some(c), Some(p)) => Some((c + p) / 2.0),
            (Some(v), None) | (None, Some(v)) => Some(v),
            (None, None) => None,
        }
    }
}

/// Aggregates of an option chain snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChainAnalysis {
    pub pcr: f64,
    pub max_pain: f64,
    /// Strike with the largest call open interest.
    pub call_resistance: f64,
    /// Strike with the largest put open interest.
    pub put_support: f64,
    /// ATM implied volatility in percent; 0 when the chain carries no IV.
    pub atm_iv: f64,
    pub chain: Vec<ChainRow>,
    /// True when derived from ATR rather than market data.
    #[serde(default)]
    pub synthetic: bool,
}

impl OptionChainAnalysis {
    /// `None` for an empty chain.
    pub fn from_rows(mut rows: Vec<ChainRow>, spot: f64) -> Option<Self> {
        rows.retain(|r| r.strike.is_finite() && r.strike > 0.0);
        if rows.is_empty() {
            return None;
        }
        rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        let total_call: f64 = rows.iter().map(|r| r.call_oi).sum();
        let total_put: f64 = rows.iter().map(|r| r.put_oi).sum();
        let pcr = if total_call > 0.0 {
            total_put / total_call
        } else {
            BASELINE_PCR
        };

        let call_resistance = max_by_key(&rows, |r| r.call_oi);
        let put_support = max_by_key(&rows, |r| r.put_oi);

        let mut by_distance: Vec<&ChainRow> = rows.iter().collect();
        by_distance.sort_by(|a, b| (a.strike - spot).abs().total_cmp(&(b.strike - spot).abs()));
        let atm_iv = by_distance.iter().find_map(|r| r.mid_iv()).unwrap_or(0.0);

        Some(Self {
            pcr: round2(pcr),
            max_pain: max_pain(&rows),
            call_resistance,
            put_support,
            atm_iv: round2(atm_iv),
            chain: rows,
            synthetic: false,
        })
    }

    /// Stand-in built from ATR when no chain data exists.
    pub fn synthetic(spot: f64, atr: f64, baseline_iv: f64) -> Self {
        Self {
            pcr: BASELINE_PCR,
            max_pain: round2(spot),
            call_resistance: round2(spot + SYNTHETIC_ATR_MULTIPLE * atr),
            put_support: round2(spot - SYNTHETIC_ATR_MULTIPLE * atr),
            atm_iv: baseline_iv,
            chain: Vec::new(),
            synthetic: true,
        }
    }
}

fn max_by_key(rows: &[ChainRow], key: impl Fn(&ChainRow) -> f64) -> f64 {
    rows.iter()
        .max_by(|a, b| key(a).total_cmp(&key(b)))
        .map_or(0.0, |r| r.strike)
}

/// Expiry price at which option writers pay out the least.
pub fn max_pain(rows: &[ChainRow]) -> f64 {
    let payout = |expiry: f64| -> f64 {
        rows.iter()
            .map(|r| {
                r.call_oi * (expiry - r.strike).max(0.0) + r.put_oi * (r.strike - expiry).max(0.0)
            })
            .sum()
    };
    rows.iter()
        .map(|r| (r.strike, payout(r.strike)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0.0, |(strike, _)| strike)
}
