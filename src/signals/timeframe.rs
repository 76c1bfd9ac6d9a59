use serde::{Deserialize, Serialize};

use super::rules::{bias_score, evaluate, IndicatorSignal, RuleInput};
use super::thresholds::ThresholdSet;
use crate::indicators::IndicatorValues;
use crate::models::{Bias, CandleSeries, Timeframe};
use crate::util::{pct_change, round2};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeSignal {
    pub timeframe: Timeframe,
    pub bias: Bias,
    pub bias_score: f64,
    pub indicators: IndicatorValues,
    pub signals: Vec<IndicatorSignal>,
    pub last_price: f64,
    /// Open of the latest candle, for the intraday move.
    pub open_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub candle_count: usize,
}

impl TimeframeSignal {
    /// `None` for an empty series.
    pub fn from_series(
        timeframe: Timeframe,
        series: &CandleSeries,
        thresholds: &ThresholdSet,
    ) -> Option<Self> {
        let last = series.last()?;
        let indicators = IndicatorValues::from_series(series);

        let weighted = evaluate(&RuleInput {
            values: &indicators,
            price: last.close,
        });
        let score = round2(bias_score(&weighted));

        let prev_close = series.previous().map_or(last.open, |c| c.close);

        Some(Self {
            timeframe,
            bias: thresholds.bias_label(score),
            bias_score: score,
            indicators,
            signals: weighted.into_iter().map(|(s, _)| s).collect(),
            last_price: last.close,
            open_price: last.open,
            price_change: round2(last.close - prev_close),
            price_change_percent: round2(pct_change(prev_close, last.close)),
            candle_count: series.len(),
        })
    }

    /// Percent move of the latest candle from its own open.
    pub fn intraday_change_percent(&self) -> f64 {
        pct_change(self.open_price, self.last_price)
    }
}
