use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::{debug, info};

use super::futures::{build_setup, FuturesSetup};
use super::overall::{anchor_timeframe, assess, OverallSignal, ScoreOverride};
use super::thresholds::ThresholdSet;
use super::timeframe::TimeframeSignal;
use crate::config::Config;
use crate::error::ConfigError;
use crate::models::{CandleSeries, MarketCondition, Timeframe};

/// Everything the signal engine derives from one set of candle series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReport {
    /// Ordered from the highest timeframe down.
    pub timeframes: Vec<TimeframeSignal>,
    pub overall: OverallSignal,
    pub condition: MarketCondition,
    pub agreement: f64,
    pub dominant_move: f64,
    pub overrides: Vec<ScoreOverride>,
    pub futures_setup: Option<FuturesSetup>,
    /// ATR of the anchor timeframe, if known.
    pub atr: Option<f64>,
    pub last_price: Option<f64>,
}

pub struct SignalEngine {
    weights: HashMap<Timeframe, f64>,
    thresholds: &'static ThresholdSet,
}

impl SignalEngine {
    pub fn new(cfg: &Config) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            weights: cfg.timeframe_weights.clone(),
            thresholds: cfg.threshold_revision.thresholds(),
        })
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        self.thresholds
    }

    /// `live_price` overrides the anchor's last close as the futures entry.
    pub fn analyze(
        &self,
        candles: &HashMap<Timeframe, CandleSeries>,
        live_price: Option<f64>,
    ) -> SignalReport {
        let timeframes: Vec<TimeframeSignal> = Timeframe::ALL
            .iter()
            .filter_map(|tf| {
                let series = candles.get(tf)?;
                let series = if series.is_ordered() {
                    Cow::Borrowed(series)
                } else {
                    debug!("[{}] reordering {} candles", tf, series.len());
                    Cow::Owned(CandleSeries::normalized(series.as_slice().to_vec()))
                };
                let signal = TimeframeSignal::from_series(*tf, &series, self.thresholds)?;
                debug!(
                    "[{}] bias={} score={:.2} candles={}",
                    tf, signal.bias, signal.bias_score, signal.candle_count
                );
                Some(signal)
            })
            .collect();

        let assessment = assess(&timeframes, &self.weights, self.thresholds);
        for o in &assessment.overrides {
            debug!("override {}: {:+.0}", o.reason, o.shift);
        }

        let anchor = anchor_timeframe(&timeframes);
        let last_price = live_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .or_else(|| anchor.map(|a| a.last_price));
        let futures_setup = match (anchor, last_price) {
            (Some(a), Some(price)) => build_setup(&assessment.overall, a, price),
            _ => None,
        };

        info!(
            "Overall {} score={:.2} confidence={} condition={} ({} timeframes)",
            assessment.overall.signal,
            assessment.overall.score,
            assessment.overall.confidence,
            assessment.condition,
            timeframes.len()
        );

        SignalReport {
            atr: anchor.and_then(|a| a.indicators.atr),
            overall: assessment.overall,
            condition: assessment.condition,
            agreement: assessment.agreement,
            dominant_move: assessment.dominant_move,
            overrides: assessment.overrides,
            futures_setup,
            last_price,
            timeframes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bias;
    use crate::test_helpers::{make_bearish_trend, make_bullish_trend};

    #[test]
    fn rejects_invalid_weights() {
        let mut cfg = Config::default();
        cfg.timeframe_weights.insert(Timeframe::Day1, -0.1);
        assert!(SignalEngine::new(&cfg).is_err());
    }

    #[test]
    fn empty_input_yields_neutral_report() {
        let engine = SignalEngine::new(&Config::default()).unwrap();
        let report = engine.analyze(&HashMap::new(), Some(300.0));
        assert!(report.timeframes.is_empty());
        assert_eq!(report.overall.signal, Bias::Neutral);
        assert!(report.futures_setup.is_none());
    }

    #[test]
    fn bullish_series_produce_long_setup() {
        let engine = SignalEngine::new(&Config::default()).unwrap();
        let candles = HashMap::from([
            (Timeframe::Day1, make_bullish_trend(80, 100.0)),
            (Timeframe::Hour1, make_bullish_trend(80, 100.0)),
        ]);
        let report = engine.analyze(&candles, None);
        assert_eq!(report.timeframes.len(), 2);
        assert_eq!(report.timeframes[0].timeframe, Timeframe::Day1);
        assert_eq!(report.overall.signal, Bias::Buy);
        assert!(report.overall.score <= 100.0);
        let setup = report.futures_setup.unwrap();
        assert_eq!(setup.direction, crate::models::Direction::Long);
        assert!(setup.stop_loss < setup.entry);
    }

    #[test]
    fn unordered_series_are_normalized() {
        let engine = SignalEngine::new(&Config::default()).unwrap();
        let ordered = make_bullish_trend(80, 100.0);
        let mut shuffled: Vec<_> = ordered.as_slice().to_vec();
        shuffled.reverse();
        shuffled.push(ordered[40].clone());
        let shuffled = CandleSeries::new(shuffled);
        assert!(!shuffled.is_ordered());

        let a = engine.analyze(&HashMap::from([(Timeframe::Day1, ordered)]), None);
        let b = engine.analyze(&HashMap::from([(Timeframe::Day1, shuffled)]), None);
        assert_eq!(a.overall.score, b.overall.score);
        assert_eq!(a.last_price, b.last_price);
        assert_eq!(b.timeframes[0].candle_count, 80);
    }

    #[test]
    fn scores_clamped_for_bearish_series() {
        let engine = SignalEngine::new(&Config::default()).unwrap();
        let candles: HashMap<_, _> = Timeframe::ALL
            .iter()
            .map(|&tf| (tf, make_bearish_trend(80, 2000.0)))
            .collect();
        let report = engine.analyze(&candles, Some(1190.0));
        assert_eq!(report.overall.signal, Bias::Sell);
        assert!(report.overall.score >= -100.0);
        assert!(report.timeframes.iter().all(|t| t.bias_score.abs() <= 100.0));
        assert_eq!(report.last_price, Some(1190.0));
    }
}
