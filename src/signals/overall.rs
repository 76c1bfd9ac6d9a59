//! Combining per-timeframe biases into one overall signal, confidence and market
//! condition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::thresholds::ThresholdSet;
use super::timeframe::TimeframeSignal;
use crate::models::{Bias, Confidence, MarketCondition, Timeframe};
use crate::util::round2;

pub const MOVE_OVERRIDE_PCT: f64 = 2.5;
pub const MOVE_SHIFT: f64 = 36.0;
pub const EMA_STRUCTURE_SHIFT: f64 = 15.0;
pub const VWAP_OVERRIDE_PCT: f64 = 0.3;
pub const VWAP_SHIFT: f64 = 6.0;
pub const DI_OVERRIDE_SPREAD: f64 = 8.0;
pub const DI_SHIFT: f64 = 10.0;
pub const MOMENTUM_OVERRIDE_PCT: f64 = 1.0;
pub const MOMENTUM_SHIFT: f64 = 10.0;

pub const VOLATILE_MOVE_PCT: f64 = 3.5;
pub const VOLATILE_ATR_PCT: f64 = 2.8;
pub const TRENDING_ADX: f64 = 22.0;
pub const TRENDING_DI_SPREAD: f64 = 5.0;
pub const TRENDING_MOVE_PCT: f64 = 1.6;
pub const ELEVATED_ATR_PCT: f64 = 2.0;

/// Fallback order when the daily timeframe is missing.
const ANCHOR_ORDER: [Timeframe; 5] = [
    Timeframe::Day1,
    Timeframe::Hour3,
    Timeframe::Hour1,
    Timeframe::Week1,
    Timeframe::Month1,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallSignal {
    pub signal: Bias,
    pub score: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOverride {
    pub reason: String,
    pub shift: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub overall: OverallSignal,
    pub condition: MarketCondition,
    /// Share of timeframes whose bias matches the overall bias.
    pub agreement: f64,
    /// Larger-magnitude of the anchor's close-to-close and intraday moves, percent.
    pub dominant_move: f64,
    pub weighted_score: f64,
    pub overrides: Vec<ScoreOverride>,
}

/// Daily timeframe when present, else the next most informative one.
pub fn anchor_timeframe(signals: &[TimeframeSignal]) -> Option<&TimeframeSignal> {
    ANCHOR_ORDER
        .iter()
        .find_map(|tf| signals.iter().find(|s| s.timeframe == *tf))
}

pub fn dominant_move(anchor: &TimeframeSignal) -> f64 {
    let close_to_close = anchor.price_change_percent;
    let intraday = anchor.intraday_change_percent();
    if intraday.abs() > close_to_close.abs() {
        intraday
    } else {
        close_to_close
    }
}

/// Weighted mean of the supplied timeframes' scores, normalized over the weights
/// actually present.
pub fn weighted_score(signals: &[TimeframeSignal], weights: &HashMap<Timeframe, f64>) -> f64 {
    let (sum, total) = signals.iter().fold((0.0, 0.0), |(sum, total), s| {
        let w = weights.get(&s.timeframe).copied().unwrap_or(0.0);
        (sum + w * s.bias_score, total + w)
    });
    if total > 0.0 {
        sum / total
    } else {
        0.0
    }
}

fn directional(value: f64, threshold: f64, shift: f64) -> f64 {
    if value >= threshold {
        shift
    } else if value <= -threshold {
        -shift
    } else {
        0.0
    }
}

/// Score shifts derived from the daily timeframe plus 1H/3H momentum.
pub fn directional_overrides(signals: &[TimeframeSignal]) -> Vec<ScoreOverride> {
    let mut overrides = Vec::new();
    let mut push = |reason: &str, shift: f64| {
        if shift != 0.0 {
            overrides.push(ScoreOverride {
                reason: reason.to_string(),
                shift,
            });
        }
    };

    if let Some(daily) = signals.iter().find(|s| s.timeframe == Timeframe::Day1) {
        let v = &daily.indicators;
        let price = daily.last_price;

        push(
            "daily move",
            directional(dominant_move(daily), MOVE_OVERRIDE_PCT, MOVE_SHIFT),
        );

        if let (Some(fast), Some(slow)) = (v.ema20, v.ema50) {
            let shift = if price > fast && fast > slow {
                EMA_STRUCTURE_SHIFT
            } else if price < fast && fast < slow {
                -EMA_STRUCTURE_SHIFT
            } else {
                0.0
            };
            push("EMA20/50 structure", shift);
        }

        if let Some(dev) = v.vwap_deviation(price) {
            let shift = if dev > VWAP_OVERRIDE_PCT {
                VWAP_SHIFT
            } else if dev < -VWAP_OVERRIDE_PCT {
                -VWAP_SHIFT
            } else {
                0.0
            };
            push("VWAP deviation", shift);
        }

        if let Some(spread) = v.di_spread() {
            push("DI spread", directional(spread, DI_OVERRIDE_SPREAD, DI_SHIFT));
        }
    }

    let intraday: Vec<f64> = signals
        .iter()
        .filter(|s| s.timeframe.is_intraday())
        .map(|s| s.price_change_percent)
        .collect();
    if !intraday.is_empty() {
        let momentum = intraday.iter().sum::<f64>() / intraday.len() as f64;
        let shift = if momentum > MOMENTUM_OVERRIDE_PCT {
            MOMENTUM_SHIFT
        } else if momentum < -MOMENTUM_OVERRIDE_PCT {
            -MOMENTUM_SHIFT
        } else {
            0.0
        };
        push("intraday momentum", shift);
    }

    overrides
}

pub fn market_condition(anchor: &TimeframeSignal) -> MarketCondition {
    let moved = dominant_move(anchor).abs();
    let atr_pct = anchor.indicators.atr_percent(anchor.last_price).unwrap_or(0.0);
    let adx = anchor.indicators.adx.unwrap_or(0.0);
    let spread = anchor.indicators.di_spread().unwrap_or(0.0).abs();

    if moved >= VOLATILE_MOVE_PCT || atr_pct >= VOLATILE_ATR_PCT {
        MarketCondition::Volatile
    } else if (adx >= TRENDING_ADX && spread >= TRENDING_DI_SPREAD) || moved >= TRENDING_MOVE_PCT {
        MarketCondition::Trending
    } else if atr_pct >= ELEVATED_ATR_PCT {
        MarketCondition::Volatile
    } else {
        MarketCondition::Ranging
    }
}

pub fn assess(
    signals: &[TimeframeSignal],
    weights: &HashMap<Timeframe, f64>,
    thresholds: &ThresholdSet,
) -> OverallAssessment {
    let weighted = weighted_score(signals, weights);
    let overrides = directional_overrides(signals);
    let shifted: f64 = weighted + overrides.iter().map(|o| o.shift).sum::<f64>();
    let score = round2(shifted.clamp(-100.0, 100.0));
    let signal = thresholds.bias_label(score);

    let agreement = if signals.is_empty() {
        0.0
    } else {
        signals.iter().filter(|s| s.bias == signal).count() as f64 / signals.len() as f64
    };

    let anchor = anchor_timeframe(signals);
    let moved = anchor.map_or(0.0, dominant_move);
    let condition = anchor.map_or(MarketCondition::Ranging, market_condition);

    OverallAssessment {
        overall: OverallSignal {
            signal,
            score,
            confidence: thresholds.confidence(agreement, score, moved),
        },
        condition,
        agreement: round2(agreement),
        dominant_move: round2(moved),
        weighted_score: round2(weighted),
        overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::indicators::IndicatorValues;
    use crate::signals::thresholds::CURRENT;

    fn tf_signal(timeframe: Timeframe, score: f64) -> TimeframeSignal {
        TimeframeSignal {
            timeframe,
            bias: CURRENT.bias_label(score),
            bias_score: score,
            indicators: IndicatorValues::default(),
            signals: Vec::new(),
            last_price: 300.0,
            open_price: 300.0,
            price_change: 0.0,
            price_change_percent: 0.0,
            candle_count: 100,
        }
    }

    fn weights() -> HashMap<Timeframe, f64> {
        Config::default().timeframe_weights
    }

    #[test]
    fn all_buy_timeframes_high_confidence() {
        let signals: Vec<_> = Timeframe::ALL.iter().map(|&tf| tf_signal(tf, 70.0)).collect();
        let a = assess(&signals, &weights(), &CURRENT);
        assert_eq!(a.overall.signal, Bias::Buy);
        assert!(a.overall.score >= 60.0);
        assert_eq!(a.overall.confidence, Confidence::High);
        assert_eq!(a.agreement, 1.0);
    }

    #[test]
    fn weights_normalize_over_present_timeframes() {
        let signals = vec![tf_signal(Timeframe::Day1, 40.0), tf_signal(Timeframe::Hour1, -20.0)];
        // (0.35 * 40 - 0.20 * 20) / 0.55
        let expected = (0.35 * 40.0 - 0.20 * 20.0) / 0.55;
        assert!((weighted_score(&signals, &weights()) - expected).abs() < 1e-9);
        assert_eq!(weighted_score(&[], &weights()), 0.0);
    }

    #[test]
    fn daily_move_override_and_clamp() {
        let mut daily = tf_signal(Timeframe::Day1, 100.0);
        daily.price_change_percent = 3.0;
        daily.indicators.ema20 = Some(290.0);
        daily.indicators.ema50 = Some(280.0);
        daily.indicators.vwap = Some(295.0);
        daily.indicators.plus_di = Some(30.0);
        daily.indicators.minus_di = Some(10.0);
        let mut h1 = tf_signal(Timeframe::Hour1, 100.0);
        h1.price_change_percent = 1.5;

        let overrides = directional_overrides(&[daily.clone(), h1.clone()]);
        let total: f64 = overrides.iter().map(|o| o.shift).sum();
        assert!((total - (36.0 + 15.0 + 6.0 + 10.0 + 10.0)).abs() < 1e-9);

        let a = assess(&[daily, h1], &weights(), &CURRENT);
        assert_eq!(a.overall.score, 100.0);
    }

    #[test]
    fn intraday_move_dominates_when_larger() {
        let mut daily = tf_signal(Timeframe::Day1, 0.0);
        daily.price_change_percent = 1.0;
        daily.open_price = 310.0; // -3.2% intraday
        assert!(dominant_move(&daily) < -3.0);
        let shifts = directional_overrides(&[daily]);
        assert_eq!(shifts[0].shift, -36.0);
    }

    #[test]
    fn score_stays_clamped_under_negative_overrides() {
        let mut daily = tf_signal(Timeframe::Day1, -100.0);
        daily.price_change_percent = -6.0;
        daily.indicators.ema20 = Some(310.0);
        daily.indicators.ema50 = Some(320.0);
        daily.indicators.plus_di = Some(5.0);
        daily.indicators.minus_di = Some(40.0);
        let a = assess(&[daily], &weights(), &CURRENT);
        assert_eq!(a.overall.score, -100.0);
        assert_eq!(a.overall.signal, Bias::Sell);
        assert_eq!(a.condition, MarketCondition::Volatile);
    }

    #[test]
    fn market_condition_branches() {
        let mut tf = tf_signal(Timeframe::Day1, 0.0);
        assert_eq!(market_condition(&tf), MarketCondition::Ranging);

        tf.indicators.atr = Some(9.0); // 3% of 300
        assert_eq!(market_condition(&tf), MarketCondition::Volatile);

        tf.indicators.atr = Some(3.0);
        tf.indicators.adx = Some(25.0);
        tf.indicators.plus_di = Some(28.0);
        tf.indicators.minus_di = Some(15.0);
        assert_eq!(market_condition(&tf), MarketCondition::Trending);

        tf.indicators.adx = Some(15.0);
        tf.indicators.atr = Some(6.3); // 2.1%
        assert_eq!(market_condition(&tf), MarketCondition::Volatile);

        tf.indicators.atr = Some(3.0);
        tf.price_change_percent = 2.0;
        assert_eq!(market_condition(&tf), MarketCondition::Trending);
    }

    #[test]
    fn empty_input_is_neutral_low() {
        let a = assess(&[], &weights(), &CURRENT);
        assert_eq!(a.overall.signal, Bias::Neutral);
        assert_eq!(a.overall.confidence, Confidence::Low);
        assert_eq!(a.condition, MarketCondition::Ranging);
    }

    #[test]
    fn anchor_falls_back_without_daily() {
        let signals = vec![tf_signal(Timeframe::Week1, 0.0), tf_signal(Timeframe::Hour1, 0.0)];
        assert_eq!(anchor_timeframe(&signals).unwrap().timeframe, Timeframe::Hour1);
    }
}
