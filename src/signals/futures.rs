//! Futures trade setup derived from the overall signal and the anchor timeframe's
//! ATR and pivots.

use serde::{Deserialize, Serialize};

use super::overall::OverallSignal;
use super::timeframe::TimeframeSignal;
use crate::models::Direction;
use crate::util::round2;

pub const STOP_ATR_MULTIPLE: f64 = 1.4;
pub const PIVOT_BUFFER_ATR: f64 = 0.1;
/// ATR stand-in as a fraction of price when the series is too short.
pub const FALLBACK_ATR_FRACTION: f64 = 0.01;

/// What decided the direction of the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeanSource {
    OverallSignal,
    DiSpread,
    EmaCross,
    PriceChange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuturesSetup {
    pub direction: Direction,
    pub lean_source: LeanSource,
    pub entry: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
    pub risk_reward: f64,
    pub atr: f64,
}

/// Overall signal first, then +DI/-DI, then EMA20 vs EMA50, then the last candle's
/// change. A flat tape with nothing to go on leans long.
pub fn resolve_lean(overall: &OverallSignal, anchor: &TimeframeSignal) -> (Direction, LeanSource) {
    if let Some(direction) = overall.signal.to_direction() {
        return (direction, LeanSource::OverallSignal);
    }

    let v = &anchor.indicators;
    if let Some(spread) = v.di_spread().filter(|s| *s != 0.0) {
        return (sign_direction(spread), LeanSource::DiSpread);
    }
    if let (Some(fast), Some(slow)) = (v.ema20, v.ema50) {
        if fast != slow {
            return (sign_direction(fast - slow), LeanSource::EmaCross);
        }
    }
    (sign_direction(anchor.price_change), LeanSource::PriceChange)
}

fn sign_direction(value: f64) -> Direction {
    if value < 0.0 {
        Direction::Short
    } else {
        Direction::Long
    }
}

pub fn build_setup(
    overall: &OverallSignal,
    anchor: &TimeframeSignal,
    entry: f64,
) -> Option<FuturesSetup> {
    if !entry.is_finite() || entry <= 0.0 {
        return None;
    }
    let (direction, lean_source) = resolve_lean(overall, anchor);
    let atr = anchor
        .indicators
        .atr
        .filter(|a| *a > 0.0)
        .unwrap_or(entry * FALLBACK_ATR_FRACTION);
    let pivots = anchor.indicators.pivots;
    let sign = direction.sign();
    let buffer = PIVOT_BUFFER_ATR * atr;

    let mut stop = entry - sign * STOP_ATR_MULTIPLE * atr;
    if let Some(p) = &pivots {
        // Nearest pivot level between the entry and the ATR stop.
        let adverse = p
            .all()
            .into_iter()
            .filter(|level| sign * (entry - level) > buffer && sign * (level - stop) > 0.0)
            .min_by(|a, b| (entry - a).abs().total_cmp(&(entry - b).abs()));
        if let Some(level) = adverse {
            stop = level - sign * buffer;
        }
    }

    let (r1, r2) = match (&pivots, direction) {
        (Some(p), Direction::Long) => (Some(p.r1), Some(p.r2)),
        (Some(p), Direction::Short) => (Some(p.s1), Some(p.s2)),
        (None, _) => (None, None),
    };
    let floor = |level: Option<f64>, multiple: f64| {
        let atr_target = entry + sign * multiple * atr;
        match level {
            Some(l) if sign * (l - atr_target) > 0.0 => l,
            _ => atr_target,
        }
    };
    let target1 = floor(r1, 1.0);
    let mut target2 = floor(r2, 2.0);
    if sign * (target2 - target1) <= 0.0 {
        target2 = target1 + sign * atr;
    }

    let risk = (entry - stop).abs();
    let reward = (target1 - entry).abs();
    let risk_reward = if risk > 0.0 { reward / risk } else { 0.0 };

    Some(FuturesSetup {
        direction,
        lean_source,
        entry: round2(entry),
        stop_loss: round2(stop),
        target1: round2(target1),
        target2: round2(target2),
        risk_reward: round2(risk_reward),
        atr: round2(atr),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{pivot_points, IndicatorValues};
    use crate::models::{Bias, Confidence, Timeframe};

    fn anchor(values: IndicatorValues, change: f64) -> TimeframeSignal {
        TimeframeSignal {
            timeframe: Timeframe::Day1,
            bias: Bias::Neutral,
            bias_score: 0.0,
            indicators: values,
            signals: Vec::new(),
            last_price: 300.0,
            open_price: 300.0,
            price_change: change,
            price_change_percent: 0.0,
            candle_count: 60,
        }
    }

    fn overall(signal: Bias) -> OverallSignal {
        OverallSignal {
            signal,
            score: 0.0,
            confidence: Confidence::Low,
        }
    }

    #[test]
    fn lean_chain_order() {
        let mut v = IndicatorValues::default();
        v.plus_di = Some(12.0);
        v.minus_di = Some(20.0);
        v.ema20 = Some(310.0);
        v.ema50 = Some(300.0);
        let a = anchor(v.clone(), 1.0);

        let buy = overall(Bias::Buy);
        let neutral = overall(Bias::Neutral);
        assert_eq!(resolve_lean(&buy, &a), (Direction::Long, LeanSource::OverallSignal));
        assert_eq!(resolve_lean(&neutral, &a), (Direction::Short, LeanSource::DiSpread));

        v.plus_di = None;
        let a = anchor(v.clone(), -1.0);
        assert_eq!(resolve_lean(&neutral, &a), (Direction::Long, LeanSource::EmaCross));

        v.ema50 = None;
        let a = anchor(v, -1.0);
        assert_eq!(resolve_lean(&neutral, &a), (Direction::Short, LeanSource::PriceChange));
    }

    #[test]
    fn long_stop_tightens_to_pivot() {
        let mut v = IndicatorValues::default();
        v.atr = Some(10.0);
        // pivot 296.67, r1 303.33, r2 311.67, s1 288.33
        v.pivots = Some(pivot_points(305.0, 290.0, 295.0));
        let s = build_setup(&overall(Bias::Buy), &anchor(v, 0.0), 300.0).unwrap();
        assert_eq!(s.direction, Direction::Long);
        // ATR stop 286 would sit below s1 and the pivot; nearest adverse is the pivot.
        assert!((s.stop_loss - 295.67).abs() < 1e-9);
        assert_eq!(s.target1, 310.0); // r1 is inside 1xATR
        assert_eq!(s.target2, 320.0);
        assert!(s.stop_loss < s.entry && s.entry < s.target1 && s.target1 < s.target2);
        assert!(s.risk_reward > 0.0);
    }

    #[test]
    fn short_targets_use_supports() {
        let mut v = IndicatorValues::default();
        v.atr = Some(2.0);
        v.pivots = Some(pivot_points(320.0, 280.0, 300.0));
        let s = build_setup(&overall(Bias::Sell), &anchor(v, 0.0), 300.0).unwrap();
        assert_eq!(s.direction, Direction::Short);
        assert_eq!(s.stop_loss, 302.8);
        assert_eq!(s.target1, 280.0); // s1
        assert_eq!(s.target2, 260.0); // s2
        assert!(s.target2 < s.target1 && s.target1 < s.entry && s.entry < s.stop_loss);
    }

    #[test]
    fn missing_atr_uses_price_fraction() {
        let bare = anchor(IndicatorValues::default(), 0.0);
        let s = build_setup(&overall(Bias::Buy), &bare, 250.0).unwrap();
        assert_eq!(s.atr, 2.5);
        assert_eq!(s.stop_loss, 246.5);
        assert_eq!(s.target1, 252.5);
        assert_eq!(s.target2, 255.0);
        assert!(build_setup(&overall(Bias::Buy), &bare, 0.0).is_none());
    }
}
