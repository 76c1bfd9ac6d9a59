//! Per-indicator signal rules as ordered tables.
//!
//! Each indicator has a weight, a reading (the displayed value; `None` means the
//! indicator is absent and is skipped) and an ordered list of rules. The first rule
//! whose predicate holds decides the signal; if none holds the indicator votes HOLD.
//! Adding an indicator or threshold means adding a table row, not a branch.

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorValues;
use crate::models::Signal;
use crate::util::round4;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_BULLISH: f64 = 55.0;
pub const RSI_BEARISH: f64 = 45.0;
pub const STOCH_OVERSOLD: f64 = 20.0;
pub const STOCH_OVERBOUGHT: f64 = 80.0;
/// Percent distance from VWAP that counts as a directional deviation.
pub const VWAP_DEVIATION: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSignal {
    pub name: String,
    pub value: f64,
    pub signal: Signal,
    pub description: String,
}

/// What a rule sees: the snapshot and the price it is judged against.
pub struct RuleInput<'a> {
    pub values: &'a IndicatorValues,
    pub price: f64,
}

pub struct SignalRule {
    pub signal: Signal,
    pub when: fn(&RuleInput) -> bool,
    pub description: &'static str,
}

const fn rule(
    signal: Signal,
    when: fn(&RuleInput) -> bool,
    description: &'static str,
) -> SignalRule {
    SignalRule {
        signal,
        when,
        description,
    }
}

pub struct IndicatorRules {
    pub name: &'static str,
    pub weight: f64,
    pub reading: fn(&RuleInput) -> Option<f64>,
    pub rules: &'static [SignalRule],
    pub neutral: &'static str,
}

pub static RULE_TABLE: &[IndicatorRules] = &[
    IndicatorRules {
        name: "RSI",
        weight: 0.15,
        reading: rsi_reading,
        rules: &[
            rule(Signal::Buy, rsi_oversold, "RSI oversold"),
            rule(Signal::Sell, rsi_overbought, "RSI overbought"),
            rule(Signal::Buy, rsi_bullish, "RSI in bullish zone"),
            rule(Signal::Sell, rsi_bearish, "RSI in bearish zone"),
        ],
        neutral: "RSI neutral",
    },
    IndicatorRules {
        name: "MACD",
        weight: 0.20,
        reading: macd_reading,
        rules: &[
            rule(Signal::Buy, macd_bullish_cross, "MACD crossed above signal"),
            rule(Signal::Sell, macd_bearish_cross, "MACD crossed below signal"),
            rule(Signal::Buy, macd_histogram_positive, "MACD histogram positive"),
            rule(Signal::Sell, macd_histogram_negative, "MACD histogram negative"),
        ],
        neutral: "MACD flat",
    },
    IndicatorRules {
        name: "EMA",
        weight: 0.20,
        reading: ema_spread,
        rules: &[
            rule(Signal::Buy, ema_golden_cross, "EMA20 crossed above EMA50"),
            rule(Signal::Sell, ema_death_cross, "EMA20 crossed below EMA50"),
            rule(Signal::Buy, ema_bullish_stack, "Price above rising EMA stack"),
            rule(Signal::Sell, ema_bearish_stack, "Price below falling EMA stack"),
        ],
        neutral: "EMAs mixed",
    },
    IndicatorRules {
        name: "Stochastic",
        weight: 0.10,
        reading: stoch_reading,
        rules: &[
            rule(Signal::Buy, stoch_bullish_cross, "%K crossed above %D"),
            rule(Signal::Sell, stoch_bearish_cross, "%K crossed below %D"),
            rule(Signal::Buy, stoch_oversold, "Stochastic oversold"),
            rule(Signal::Sell, stoch_overbought, "Stochastic overbought"),
        ],
        neutral: "Stochastic mid-range",
    },
    IndicatorRules {
        name: "Bollinger",
        weight: 0.10,
        reading: bollinger_percent_b,
        rules: &[
            rule(Signal::Buy, at_lower_band, "Price at lower band"),
            rule(Signal::Sell, at_upper_band, "Price at upper band"),
        ],
        neutral: "Price inside bands",
    },
    IndicatorRules {
        name: "VWAP",
        weight: 0.10,
        reading: vwap_reading,
        rules: &[
            rule(Signal::Buy, above_vwap, "Price above VWAP"),
            rule(Signal::Sell, below_vwap, "Price below VWAP"),
        ],
        neutral: "Price near VWAP",
    },
    IndicatorRules {
        name: "Pivot",
        weight: 0.15,
        reading: pivot_reading,
        rules: &[
            rule(Signal::Buy, above_r1, "Breakout above R1"),
            rule(Signal::Sell, below_s1, "Breakdown below S1"),
        ],
        neutral: "Between S1 and R1",
    },
];

fn rsi_reading(i: &RuleInput) -> Option<f64> {
    i.values.rsi
}

fn macd_reading(i: &RuleInput) -> Option<f64> {
    i.values.macd_histogram
}

fn ema_spread(i: &RuleInput) -> Option<f64> {
    Some(i.values.ema20? - i.values.ema50?)
}

fn stoch_reading(i: &RuleInput) -> Option<f64> {
    i.values.stoch_k
}

fn vwap_reading(i: &RuleInput) -> Option<f64> {
    i.values.vwap_deviation(i.price)
}

fn pivot_reading(i: &RuleInput) -> Option<f64> {
    i.values.pivots.map(|p| p.pivot)
}

fn rsi_oversold(i: &RuleInput) -> bool {
    i.values.rsi.is_some_and(|v| v < RSI_OVERSOLD)
}

fn rsi_overbought(i: &RuleInput) -> bool {
    i.values.rsi.is_some_and(|v| v > RSI_OVERBOUGHT)
}

fn rsi_bullish(i: &RuleInput) -> bool {
    i.values.rsi.is_some_and(|v| v >= RSI_BULLISH)
}

fn rsi_bearish(i: &RuleInput) -> bool {
    i.values.rsi.is_some_and(|v| v <= RSI_BEARISH)
}

/// `Some((prev_a, prev_b, a, b))` when all four are present.
fn pair(
    prev_a: Option<f64>,
    prev_b: Option<f64>,
    a: Option<f64>,
    b: Option<f64>,
) -> Option<(f64, f64, f64, f64)> {
    Some((prev_a?, prev_b?, a?, b?))
}

fn crossed_above(prev_a: Option<f64>, prev_b: Option<f64>, a: Option<f64>, b: Option<f64>) -> bool {
    pair(prev_a, prev_b, a, b).is_some_and(|(pa, pb, a, b)| pa <= pb && a > b)
}

fn crossed_below(prev_a: Option<f64>, prev_b: Option<f64>, a: Option<f64>, b: Option<f64>) -> bool {
    pair(prev_a, prev_b, a, b).is_some_and(|(pa, pb, a, b)| pa >= pb && a < b)
}

fn macd_bullish_cross(i: &RuleInput) -> bool {
    let v = i.values;
    crossed_above(v.prev_macd, v.prev_macd_signal, v.macd, v.macd_signal)
}

fn macd_bearish_cross(i: &RuleInput) -> bool {
    let v = i.values;
    crossed_below(v.prev_macd, v.prev_macd_signal, v.macd, v.macd_signal)
}

fn macd_histogram_positive(i: &RuleInput) -> bool {
    i.values.macd_histogram.is_some_and(|h| h > 0.0)
}

fn macd_histogram_negative(i: &RuleInput) -> bool {
    i.values.macd_histogram.is_some_and(|h| h < 0.0)
}

fn ema_golden_cross(i: &RuleInput) -> bool {
    let v = i.values;
    crossed_above(v.prev_ema20, v.prev_ema50, v.ema20, v.ema50)
}

fn ema_death_cross(i: &RuleInput) -> bool {
    let v = i.values;
    crossed_below(v.prev_ema20, v.prev_ema50, v.ema20, v.ema50)
}

fn ema_bullish_stack(i: &RuleInput) -> bool {
    matches!(
        (i.values.ema20, i.values.ema50),
        (Some(fast), Some(slow)) if fast > slow && i.price > fast
    )
}

fn ema_bearish_stack(i: &RuleInput) -> bool {
    matches!(
        (i.values.ema20, i.values.ema50),
        (Some(fast), Some(slow)) if fast < slow && i.price < fast
    )
}

fn stoch_bullish_cross(i: &RuleInput) -> bool {
    let v = i.values;
    crossed_above(v.prev_stoch_k, v.prev_stoch_d, v.stoch_k, v.stoch_d)
}

fn stoch_bearish_cross(i: &RuleInput) -> bool {
    let v = i.values;
    crossed_below(v.prev_stoch_k, v.prev_stoch_d, v.stoch_k, v.stoch_d)
}

fn stoch_oversold(i: &RuleInput) -> bool {
    i.values.stoch_k.is_some_and(|k| k < STOCH_OVERSOLD)
}

fn stoch_overbought(i: &RuleInput) -> bool {
    i.values.stoch_k.is_some_and(|k| k > STOCH_OVERBOUGHT)
}

fn bollinger_percent_b(i: &RuleInput) -> Option<f64> {
    let b = i.values.bollinger?;
    let width = b.upper - b.lower;
    if width <= 0.0 {
        return Some(50.0);
    }
    Some((i.price - b.lower) / width * 100.0)
}

fn at_lower_band(i: &RuleInput) -> bool {
    i.values
        .bollinger
        .is_some_and(|b| b.upper > b.lower && i.price <= b.lower)
}

fn at_upper_band(i: &RuleInput) -> bool {
    i.values
        .bollinger
        .is_some_and(|b| b.upper > b.lower && i.price >= b.upper)
}

fn above_vwap(i: &RuleInput) -> bool {
    i.values
        .vwap_deviation(i.price)
        .is_some_and(|d| d > VWAP_DEVIATION)
}

fn below_vwap(i: &RuleInput) -> bool {
    i.values
        .vwap_deviation(i.price)
        .is_some_and(|d| d < -VWAP_DEVIATION)
}

fn above_r1(i: &RuleInput) -> bool {
    i.values.pivots.is_some_and(|p| i.price > p.r1)
}

fn below_s1(i: &RuleInput) -> bool {
    i.values.pivots.is_some_and(|p| i.price < p.s1)
}

/// Signals for every present indicator, each paired with its weight.
pub fn evaluate(input: &RuleInput) -> Vec<(IndicatorSignal, f64)> {
    RULE_TABLE
        .iter()
        .filter_map(|set| {
            let value = (set.reading)(input)?;
            let (signal, description) = set
                .rules
                .iter()
                .find(|rule| (rule.when)(input))
                .map_or((Signal::Hold, set.neutral), |rule| {
                    (rule.signal, rule.description)
                });
            Some((
                IndicatorSignal {
                    name: set.name.to_string(),
                    value: round4(value),
                    signal,
                    description: description.to_string(),
                },
                set.weight,
            ))
        })
        .collect()
}

/// 100 * weighted vote sum / total weight of the indicators that voted, in [-100, 100].
pub fn bias_score(signals: &[(IndicatorSignal, f64)]) -> f64 {
    let total: f64 = signals.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let votes: f64 = signals.iter().map(|(s, w)| s.signal.vote() * w).sum();
    (100.0 * votes / total).clamp(-100.0, 100.0)
}
