use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::builders::{build, StrategyKind, StrategyLeg, StrategyPlan, StrikeGrid};
use super::chain::OptionChainAnalysis;
use crate::config::Config;
use crate::models::{Bias, Confidence, MarketCondition, OptionType, RiskLevel, TradeAction};
use crate::signals::SignalReport;
use crate::util::round2;

pub const IV_HIGH_RATIO: f64 = 1.2;
pub const IV_LOW_RATIO: f64 = 0.8;
pub const PCR_BULLISH: f64 = 1.2;
pub const PCR_BEARISH: f64 = 0.8;
pub const NEAR_EXPIRY_DAYS: u32 = 7;
pub const STRADDLE_MIN_DTE: u32 = 15;
/// ATR stand-in as a fraction of spot when the signal report has none.
pub const FALLBACK_ATR_FRACTION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IvRegime {
    Low,
    Normal,
    High,
}

impl IvRegime {
    pub fn classify(atm_iv: f64, baseline: f64) -> Self {
        if atm_iv >= baseline * IV_HIGH_RATIO {
            IvRegime::High
        } else if atm_iv <= baseline * IV_LOW_RATIO {
            IvRegime::Low
        } else {
            IvRegime::Normal
        }
    }
}

impl fmt::Display for IvRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IvRegime::Low => write!(f, "LOW"),
            IvRegime::Normal => write!(f, "NORMAL"),
            IvRegime::High => write!(f, "HIGH"),
        }
    }
}

/// Contrarian reading of the put-call ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PcrSkew {
    Bullish,
    Bearish,
    Neutral,
}

impl PcrSkew {
    pub fn classify(pcr: f64) -> Self {
        if pcr >= PCR_BULLISH {
            PcrSkew::Bullish
        } else if pcr <= PCR_BEARISH {
            PcrSkew::Bearish
        } else {
            PcrSkew::Neutral
        }
    }
}

/// Days-to-expiry guess from ATM IV when no expiry is known.
pub fn estimate_dte(atm_iv: f64) -> u32 {
    if atm_iv > 60.0 {
        5
    } else if atm_iv > 40.0 {
        10
    } else {
        20
    }
}

/// The signal engine's bias, or the PCR skew when the engine is neutral.
pub fn effective_bias(overall: Bias, skew: PcrSkew) -> Bias {
    match (overall, skew) {
        (Bias::Neutral, PcrSkew::Bullish) => Bias::Buy,
        (Bias::Neutral, PcrSkew::Bearish) => Bias::Sell,
        (bias, _) => bias,
    }
}

/// Decision matrix. Never returns a debit strategy within `NEAR_EXPIRY_DAYS`.
pub fn choose_strategy(
    iv: IvRegime,
    bias: Bias,
    condition: MarketCondition,
    dte: u32,
) -> StrategyKind {
    let near_expiry = dte < NEAR_EXPIRY_DAYS;
    match bias {
        Bias::Buy if iv == IvRegime::High || near_expiry => StrategyKind::BullPutSpread,
        Bias::Buy => StrategyKind::BullCallSpread,
        Bias::Sell if iv == IvRegime::High || near_expiry => StrategyKind::BearCallSpread,
        Bias::Sell => StrategyKind::BearPutSpread,
        Bias::Neutral => match iv {
            IvRegime::High if near_expiry => StrategyKind::ShortStrangle,
            IvRegime::High => StrategyKind::IronCondor,
            IvRegime::Low if dte >= STRADDLE_MIN_DTE => StrategyKind::LongStraddle,
            IvRegime::Normal
                if condition == MarketCondition::Volatile && dte >= STRADDLE_MIN_DTE =>
            {
                StrategyKind::LongStraddle
            }
            _ => StrategyKind::IronCondor,
        },
    }
}

/// Same-direction strategy from the other premium family, if that family is allowed.
pub fn alternative_strategy(primary: StrategyKind, iv: IvRegime, dte: u32) -> Option<StrategyKind> {
    let debit_allowed = dte >= NEAR_EXPIRY_DAYS && iv != IvRegime::High;
    match primary {
        StrategyKind::BullCallSpread => Some(StrategyKind::BullPutSpread),
        StrategyKind::BearPutSpread => Some(StrategyKind::BearCallSpread),
        StrategyKind::BullPutSpread if debit_allowed => Some(StrategyKind::BullCallSpread),
        StrategyKind::BearCallSpread if debit_allowed => Some(StrategyKind::BearPutSpread),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecommendation {
    pub action: TradeAction,
    pub option_type: OptionType,
    pub strike_price: f64,
    pub expected_move: f64,
    pub rationale: String,
    pub risk_level: RiskLevel,
    pub strategy: StrategyKind,
    pub strategy_name: String,
    pub strikes: Vec<StrategyLeg>,
    /// Per unit; `None` when unlimited.
    pub max_profit: Option<f64>,
    /// Per unit; `None` when unlimited.
    pub max_loss: Option<f64>,
    pub breakevens: Vec<f64>,
    pub iv_context: String,
    pub dte: u32,
    pub confidence: Confidence,
}

/// Market view the selector works from.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext {
    pub bias: Bias,
    pub confidence: Confidence,
    pub condition: MarketCondition,
    pub spot: f64,
    pub atr: f64,
}

impl SelectionContext {
    /// `None` when the report carries no usable price.
    pub fn from_report(report: &SignalReport) -> Option<Self> {
        let spot = report.last_price.filter(|p| *p > 0.0)?;
        let atr = report
            .atr
            .filter(|a| *a > 0.0)
            .unwrap_or(spot * FALLBACK_ATR_FRACTION);
        Some(Self {
            bias: report.overall.signal,
            confidence: report.overall.confidence,
            condition: report.condition,
            spot,
            atr,
        })
    }
}

pub struct StrategySelector {
    iv_baseline: f64,
    strike_step: f64,
}

impl StrategySelector {
    pub fn new(cfg: &Config) -> Self {
        Self {
            iv_baseline: cfg.iv_baseline,
            strike_step: cfg.strike_step,
        }
    }

    /// Primary recommendation first, then an alternative for directional views.
    /// A missing chain is replaced by a synthetic one; `dte` falls back to an
    /// IV-based estimate.
    pub fn recommend(
        &self,
        ctx: &SelectionContext,
        chain: Option<&OptionChainAnalysis>,
        dte: Option<u32>,
    ) -> Vec<StrategyRecommendation> {
        let synthetic;
        let chain = match chain {
            Some(c) => c,
            None => {
                debug!("No option chain, using synthetic levels from ATR {:.2}", ctx.atr);
                synthetic = OptionChainAnalysis::synthetic(ctx.spot, ctx.atr, self.iv_baseline);
                &synthetic
            }
        };

        let atm_iv = if chain.atm_iv > 0.0 {
            chain.atm_iv
        } else {
            self.iv_baseline
        };
        let iv = IvRegime::classify(atm_iv, self.iv_baseline);
        let skew = PcrSkew::classify(chain.pcr);
        let bias = effective_bias(ctx.bias, skew);
        let dte = dte.unwrap_or_else(|| estimate_dte(atm_iv));

        let grid = StrikeGrid {
            spot: ctx.spot,
            atr: ctx.atr,
            step: self.strike_step,
            dte,
            resistance: anchor_above(chain.call_resistance, ctx.spot, ctx.atr),
            support: anchor_below(chain.put_support, ctx.spot, ctx.atr),
        };
        let expected_move = round2(ctx.spot * atm_iv / 100.0 * (f64::from(dte) / 365.0).sqrt());
        let iv_context = format!(
            "ATM IV {:.1}% vs {:.0}% baseline ({}), PCR {:.2}",
            atm_iv, self.iv_baseline, iv, chain.pcr
        );

        let primary = choose_strategy(iv, bias, ctx.condition, dte);
        let mut kinds = vec![primary];
        if let Some(alt) = alternative_strategy(primary, iv, dte) {
            kinds.push(alt);
        }

        let confidence = base_confidence(ctx, bias, dte);
        let recs: Vec<StrategyRecommendation> = kinds
            .into_iter()
            .enumerate()
            .filter_map(|(i, kind)| {
                let plan = build(kind, &grid);
                let confidence = if i == 0 { confidence } else { downgrade(confidence) };
                let rationale = rationale(&plan, ctx, bias, iv, dte);
                recommendation(plan, expected_move, rationale, iv_context.clone(), dte, confidence)
            })
            .collect();

        if let Some(first) = recs.first() {
            info!(
                "Strategy {} ({} {} @ {}) bias={} iv={} dte={} confidence={}",
                first.strategy_name,
                first.action,
                first.option_type,
                first.strike_price,
                bias,
                iv,
                dte,
                first.confidence
            );
        }
        recs
    }
}

fn anchor_above(level: f64, spot: f64, atr: f64) -> f64 {
    if level > spot {
        level
    } else {
        spot + 2.0 * atr
    }
}

fn anchor_below(level: f64, spot: f64, atr: f64) -> f64 {
    if level > 0.0 && level < spot {
        level
    } else {
        spot - 2.0 * atr
    }
}

fn base_confidence(ctx: &SelectionContext, bias: Bias, dte: u32) -> Confidence {
    if bias != ctx.bias {
        // Bias came from PCR alone.
        return Confidence::Low;
    }
    match bias {
        Bias::Neutral if ctx.condition == MarketCondition::Ranging => Confidence::Medium,
        Bias::Neutral if dte < STRADDLE_MIN_DTE => Confidence::Low,
        _ => ctx.confidence,
    }
}

fn downgrade(c: Confidence) -> Confidence {
    match c {
        Confidence::High => Confidence::Medium,
        _ => Confidence::Low,
    }
}

fn rationale(
    plan: &StrategyPlan,
    ctx: &SelectionContext,
    bias: Bias,
    iv: IvRegime,
    dte: u32,
) -> String {
    let view = match bias {
        Bias::Buy => "bullish",
        Bias::Sell => "bearish",
        Bias::Neutral => "range-bound",
    };
    let premium = if plan.kind.is_debit() {
        "buying premium"
    } else {
        "selling premium"
    };
    let mut text = format!(
        "{} view in a {} market with {} IV and {} DTE: {}",
        view,
        ctx.condition.to_string().to_lowercase(),
        iv.to_string().to_lowercase(),
        dte,
        premium
    );
    if dte < NEAR_EXPIRY_DAYS {
        text.push_str(", near expiry so defined-risk selling");
    }
    if plan.max_loss.is_none() {
        text.push_str(". Undefined risk on a breakout");
    }
    text
}

fn recommendation(
    plan: StrategyPlan,
    expected_move: f64,
    rationale: String,
    iv_context: String,
    dte: u32,
    confidence: Confidence,
) -> Option<StrategyRecommendation> {
    let head = *plan.headline_leg()?;
    let option_type = match plan.kind {
        StrategyKind::IronCondor | StrategyKind::ShortStrangle | StrategyKind::LongStraddle => {
            OptionType::Call
        }
        _ => head.option_type,
    };
    Some(StrategyRecommendation {
        action: head.action,
        option_type,
        strike_price: head.strike,
        expected_move,
        rationale,
        risk_level: plan.risk_level,
        strategy: plan.kind,
        strategy_name: plan.kind.name().to_string(),
        strikes: plan.legs,
        max_profit: plan.max_profit,
        max_loss: plan.max_loss,
        breakevens: plan.breakevens,
        iv_context,
        dte,
        confidence,
    })
}
