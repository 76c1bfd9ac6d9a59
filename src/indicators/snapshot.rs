use serde::{Deserialize, Serialize};

use super::levels::{fibonacci_retracement, pivot_points, vwap, FibLevel, PivotLevels};
use super::momentum::{macd, rsi, stochastic};
use super::moving_average::{ema, sma};
use super::trend::adx;
use super::volatility::{atr, bollinger, Bands};
use crate::models::CandleSeries;
use crate::util::round4;

pub const RSI_PERIOD: usize = 14;
pub const EMA_FAST: usize = 20;
pub const EMA_SLOW: usize = 50;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_MULTIPLIER: f64 = 2.0;
pub const STOCH_K: usize = 14;
pub const STOCH_D: usize = 3;
pub const ATR_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;
pub const FIB_LOOKBACK: usize = 50;

/// Every indicator at the latest candle of one timeframe. A field stays `None` until
/// the series is long enough for that indicator. `prev_*` fields hold the value one
/// bar earlier for cross detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorValues {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub prev_macd: Option<f64>,
    pub prev_macd_signal: Option<f64>,
    pub sma20: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub prev_ema20: Option<f64>,
    pub prev_ema50: Option<f64>,
    pub bollinger: Option<Bands>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub prev_stoch_k: Option<f64>,
    pub prev_stoch_d: Option<f64>,
    pub atr: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub vwap: Option<f64>,
    pub pivots: Option<PivotLevels>,
    pub fibonacci: Option<Vec<FibLevel>>,
}

fn last_two(series: &[Option<f64>]) -> (Option<f64>, Option<f64>) {
    let n = series.len();
    let last = series.last().copied().flatten();
    let prev = n.checked_sub(2).and_then(|i| series[i]);
    (last.map(round4), prev.map(round4))
}

impl IndicatorValues {
    pub fn from_series(series: &CandleSeries) -> Self {
        if series.is_empty() {
            return Self::default();
        }

        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();

        let (rsi, _) = last_two(&rsi(&closes, RSI_PERIOD));

        let m = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let (macd, prev_macd) = last_two(&m.macd);
        let (macd_signal, prev_macd_signal) = last_two(&m.signal);
        let (macd_histogram, _) = last_two(&m.histogram);

        let (sma20, _) = last_two(&sma(&closes, EMA_FAST));
        let (ema20, prev_ema20) = last_two(&ema(&closes, EMA_FAST));
        let (ema50, prev_ema50) = last_two(&ema(&closes, EMA_SLOW));

        let bollinger = bollinger(&closes, BB_PERIOD, BB_MULTIPLIER)
            .last()
            .copied()
            .flatten()
            .map(|b| Bands {
                upper: round4(b.upper),
                middle: round4(b.middle),
                lower: round4(b.lower),
            });

        let st = stochastic(&highs, &lows, &closes, STOCH_K, STOCH_D);
        let (stoch_k, prev_stoch_k) = last_two(&st.k);
        let (stoch_d, prev_stoch_d) = last_two(&st.d);

        let (atr, _) = last_two(&atr(&highs, &lows, &closes, ATR_PERIOD));

        let dmi = adx(&highs, &lows, &closes, ADX_PERIOD);
        let (adx, _) = last_two(&dmi.adx);
        let (plus_di, _) = last_two(&dmi.plus_di);
        let (minus_di, _) = last_two(&dmi.minus_di);

        let (vwap, _) = last_two(&vwap(series.as_slice()));

        let pivots = series
            .previous()
            .map(|c| pivot_points(c.high, c.low, c.close));

        let fibonacci = (series.len() >= 2).then(|| {
            let window = series.tail(FIB_LOOKBACK);
            fibonacci_retracement(window.highs_max(), window.lows_min())
        });

        Self {
            rsi,
            macd,
            macd_signal,
            macd_histogram,
            prev_macd,
            prev_macd_signal,
            sma20,
            ema20,
            ema50,
            prev_ema20,
            prev_ema50,
            bollinger,
            stoch_k,
            stoch_d,
            prev_stoch_k,
            prev_stoch_d,
            atr,
            adx,
            plus_di,
            minus_di,
            vwap,
            pivots,
            fibonacci,
        }
    }

    /// ATR as a percentage of `price`.
    pub fn atr_percent(&self, price: f64) -> Option<f64> {
        match self.atr {
            Some(atr) if price > 0.0 => Some(atr / price * 100.0),
            _ => None,
        }
    }

    /// +DI minus -DI.
    pub fn di_spread(&self) -> Option<f64> {
        Some(self.plus_di? - self.minus_di?)
    }

    /// Percent distance of `price` above (positive) or below VWAP.
    pub fn vwap_deviation(&self, price: f64) -> Option<f64> {
        match self.vwap {
            Some(vwap) if vwap > 0.0 => Some((price - vwap) / vwap * 100.0),
            _ => None,
        }
    }
}
