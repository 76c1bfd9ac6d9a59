//! One-call market analysis: signals, futures setup and strategy picks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::Config;
use crate::error::ConfigError;
use crate::models::{CandleSeries, MarketCondition, Timeframe};
use crate::signals::{FuturesSetup, OverallSignal, SignalEngine, TimeframeSignal};
use crate::strategies::{
    OptionChainAnalysis, SelectionContext, StrategyRecommendation, StrategySelector,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketReport {
    pub timeframes: Vec<TimeframeSignal>,
    pub overall: OverallSignal,
    pub condition: MarketCondition,
    pub futures_setup: Option<FuturesSetup>,
    pub strategies: Vec<StrategyRecommendation>,
}

impl MarketReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct MarketAnalyzer {
    engine: SignalEngine,
    selector: StrategySelector,
}

impl MarketAnalyzer {
    pub fn new(cfg: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            engine: SignalEngine::new(cfg)?,
            selector: StrategySelector::new(cfg),
        })
    }

    /// `dte` is the days to the traded expiry when known.
    pub fn analyze(
        &self,
        candles: &HashMap<Timeframe, CandleSeries>,
        chain: Option<&OptionChainAnalysis>,
        live_price: Option<f64>,
        dte: Option<u32>,
    ) -> MarketReport {
        let report = self.engine.analyze(candles, live_price);
        let strategies = SelectionContext::from_report(&report)
            .map(|ctx| self.selector.recommend(&ctx, chain, dte))
            .unwrap_or_default();

        MarketReport {
            timeframes: report.timeframes,
            overall: report.overall,
            condition: report.condition,
            futures_setup: report.futures_setup,
            strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{default_test_config, make_bullish_trend};

    #[test]
    fn report_serializes_with_uppercase_labels() {
        let analyzer = MarketAnalyzer::new(&default_test_config()).unwrap();
        let candles = HashMap::from([(Timeframe::Day1, make_bullish_trend(80, 100.0))]);
        let report = analyzer.analyze(&candles, None, None, None);
        assert!(!report.strategies.is_empty());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"signal\": \"BUY\""));
        assert!(json.contains("\"timeframe\": \"1D\""));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["strategies"][0]["option_type"], "CE");
    }

    #[test]
    fn no_candles_no_strategies() {
        let analyzer = MarketAnalyzer::new(&default_test_config()).unwrap();
        let report = analyzer.analyze(&HashMap::new(), None, None, None);
        assert!(report.strategies.is_empty());
        assert!(report.futures_setup.is_none());
    }
}
