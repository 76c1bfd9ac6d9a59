//! Strike placement and payoff arithmetic for each supported options strategy.
//!
//! Premiums are per-unit estimates derived from ATR: an at-the-money time value of
//! `0.5 * ATR * sqrt(dte / 5)`, decaying with distance from spot, plus intrinsic
//! value. Max profit and loss are per unit; `None` means unlimited.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{OptionType, RiskLevel, TradeAction};
use crate::util::round2;

pub const ATM_PREMIUM_ATR: f64 = 0.5;
pub const PREMIUM_DTE_SCALE: f64 = 5.0;
pub const MIN_PREMIUM: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    IronCondor,
    ShortStrangle,
    BullCallSpread,
    BearPutSpread,
    BullPutSpread,
    BearCallSpread,
    LongStraddle,
}

impl StrategyKind {
    /// Net premium paid to open.
    pub fn is_debit(self) -> bool {
        matches!(
            self,
            StrategyKind::BullCallSpread | StrategyKind::BearPutSpread | StrategyKind::LongStraddle
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::IronCondor => "Iron Condor",
            StrategyKind::ShortStrangle => "Short Strangle",
            StrategyKind::BullCallSpread => "Bull Call Spread",
            StrategyKind::BearPutSpread => "Bear Put Spread",
            StrategyKind::BullPutSpread => "Bull Put Spread",
            StrategyKind::BearCallSpread => "Bear Call Spread",
            StrategyKind::LongStraddle => "Long Straddle",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyLeg {
    pub action: TradeAction,
    pub option_type: OptionType,
    pub strike: f64,
    /// Estimated premium per unit.
    pub premium: f64,
}

/// Strikes, premiums and payoff of a built strategy before it is dressed up as a
/// recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyPlan {
    pub kind: StrategyKind,
    pub legs: Vec<StrategyLeg>,
    /// Positive for credit, negative for debit.
    pub net_premium: f64,
    pub max_profit: Option<f64>,
    pub max_loss: Option<f64>,
    pub breakevens: Vec<f64>,
    pub risk_level: RiskLevel,
}

impl StrategyPlan {
    /// Leg that represents the trade in a single-line summary.
    pub fn headline_leg(&self) -> Option<&StrategyLeg> {
        match self.kind {
            StrategyKind::BullCallSpread
            | StrategyKind::BearPutSpread
            | StrategyKind::LongStraddle => self.legs.iter().find(|l| l.action == TradeAction::Buy),
            _ => self.legs.iter().find(|l| l.action == TradeAction::Sell),
        }
    }
}

/// Market inputs shared by every builder.
#[derive(Debug, Clone, Copy)]
pub struct StrikeGrid {
    pub spot: f64,
    pub atr: f64,
    pub step: f64,
    pub dte: u32,
    /// Upside anchor, above spot.
    pub resistance: f64,
    /// Downside anchor, below spot.
    pub support: f64,
}

impl StrikeGrid {
    pub fn snap(&self, price: f64) -> f64 {
        (price / self.step).round() * self.step
    }

    pub fn snap_up(&self, price: f64) -> f64 {
        (price / self.step).ceil() * self.step
    }

    pub fn snap_down(&self, price: f64) -> f64 {
        (price / self.step).floor() * self.step
    }

    pub fn atm(&self) -> f64 {
        self.snap(self.spot)
    }

    /// Short call strike: at the resistance anchor, at least one step above ATM.
    pub fn call_short(&self) -> f64 {
        self.snap_up(self.resistance).max(self.atm() + self.step)
    }

    /// Short put strike: at the support anchor, at least one step below ATM.
    pub fn put_short(&self) -> f64 {
        self.snap_down(self.support).min(self.atm() - self.step)
    }

    /// Protective wing distance, one ATR rounded to the grid.
    pub fn wing(&self) -> f64 {
        self.snap(self.atr).max(self.step)
    }

    pub fn premium(&self, option_type: OptionType, strike: f64) -> f64 {
        let atr = self.atr.max(f64::EPSILON);
        let time_value = ATM_PREMIUM_ATR
            * self.atr
            * (f64::from(self.dte.max(1)) / PREMIUM_DTE_SCALE).sqrt()
            * (-(strike - self.spot).abs() / (2.0 * atr)).exp();
        let intrinsic = match option_type {
            OptionType::Call => (self.spot - strike).max(0.0),
            OptionType::Put => (strike - self.spot).max(0.0),
        };
        round2((intrinsic + time_value).max(MIN_PREMIUM))
    }

    fn leg(&self, action: TradeAction, option_type: OptionType, strike: f64) -> StrategyLeg {
        StrategyLeg {
            action,
            option_type,
            strike: round2(strike),
            premium: self.premium(option_type, strike),
        }
    }
}

pub fn build(kind: StrategyKind, grid: &StrikeGrid) -> StrategyPlan {
    match kind {
        StrategyKind::BullCallSpread => vertical_debit(grid, OptionType::Call),
        StrategyKind::BearPutSpread => vertical_debit(grid, OptionType::Put),
        StrategyKind::BullPutSpread => vertical_credit(grid, OptionType::Put),
        StrategyKind::BearCallSpread => vertical_credit(grid, OptionType::Call),
        StrategyKind::IronCondor => iron_condor(grid),
        StrategyKind::ShortStrangle => short_strangle(grid),
        StrategyKind::LongStraddle => long_straddle(grid),
    }
}

/// Buy ATM, sell at the anchor in the direction of the trade.
fn vertical_debit(grid: &StrikeGrid, option_type: OptionType) -> StrategyPlan {
    let long_strike = grid.atm();
    let (kind, short_strike) = match option_type {
        OptionType::Call => (StrategyKind::BullCallSpread, grid.call_short()),
        OptionType::Put => (StrategyKind::BearPutSpread, grid.put_short()),
    };
    let long = grid.leg(TradeAction::Buy, option_type, long_strike);
    let short = grid.leg(TradeAction::Sell, option_type, short_strike);
    let width = (short_strike - long_strike).abs();
    let debit = (long.premium - short.premium).clamp(0.0, width);
    let breakeven = match option_type {
        OptionType::Call => long_strike + debit,
        OptionType::Put => long_strike - debit,
    };

    StrategyPlan {
        kind,
        legs: vec![long, short],
        net_premium: round2(-debit),
        max_profit: Some(round2(width - debit)),
        max_loss: Some(round2(debit)),
        breakevens: vec![round2(breakeven)],
        risk_level: RiskLevel::Low,
    }
}

/// Sell at the anchor against the trade direction, buy one wing further out.
fn vertical_credit(grid: &StrikeGrid, option_type: OptionType) -> StrategyPlan {
    let wing = grid.wing();
    let (kind, short_strike, long_strike) = match option_type {
        OptionType::Put => {
            let s = grid.put_short();
            (StrategyKind::BullPutSpread, s, s - wing)
        }
        OptionType::Call => {
            let s = grid.call_short();
            (StrategyKind::BearCallSpread, s, s + wing)
        }
    };
    let short = grid.leg(TradeAction::Sell, option_type, short_strike);
    let long = grid.leg(TradeAction::Buy, option_type, long_strike);
    let credit = (short.premium - long.premium).clamp(0.0, wing);
    let breakeven = match option_type {
        OptionType::Put => short_strike - credit,
        OptionType::Call => short_strike + credit,
    };

    StrategyPlan {
        kind,
        legs: vec![short, long],
        net_premium: round2(credit),
        max_profit: Some(round2(credit)),
        max_loss: Some(round2(wing - credit)),
        breakevens: vec![round2(breakeven)],
        risk_level: RiskLevel::Medium,
    }
}

fn iron_condor(grid: &StrikeGrid) -> StrategyPlan {
    let wing = grid.wing();
    let put_short = grid.put_short();
    let call_short = grid.call_short();
    let legs = vec![
        grid.leg(TradeAction::Buy, OptionType::Put, put_short - wing),
        grid.leg(TradeAction::Sell, OptionType::Put, put_short),
        grid.leg(TradeAction::Sell, OptionType::Call, call_short),
        grid.leg(TradeAction::Buy, OptionType::Call, call_short + wing),
    ];
    let credit = net_credit(&legs).clamp(0.0, wing);

    StrategyPlan {
        kind: StrategyKind::IronCondor,
        legs,
        net_premium: round2(credit),
        max_profit: Some(round2(credit)),
        max_loss: Some(round2(wing - credit)),
        breakevens: vec![round2(put_short - credit), round2(call_short + credit)],
        risk_level: RiskLevel::Medium,
    }
}

/// Naked short put and call at the anchors. Loss is unbounded.
fn short_strangle(grid: &StrikeGrid) -> StrategyPlan {
    let put_short = grid.put_short();
    let call_short = grid.call_short();
    let legs = vec![
        grid.leg(TradeAction::Sell, OptionType::Put, put_short),
        grid.leg(TradeAction::Sell, OptionType::Call, call_short),
    ];
    let credit = net_credit(&legs);

    StrategyPlan {
        kind: StrategyKind::ShortStrangle,
        legs,
        net_premium: round2(credit),
        max_profit: Some(round2(credit)),
        max_loss: None,
        breakevens: vec![round2(put_short - credit), round2(call_short + credit)],
        risk_level: RiskLevel::High,
    }
}

fn long_straddle(grid: &StrikeGrid) -> StrategyPlan {
    let atm = grid.atm();
    let legs = vec![
        grid.leg(TradeAction::Buy, OptionType::Call, atm),
        grid.leg(TradeAction::Buy, OptionType::Put, atm),
    ];
    let debit = -net_credit(&legs);

    StrategyPlan {
        kind: StrategyKind::LongStraddle,
        legs,
        net_premium: round2(-debit),
        max_profit: None,
        max_loss: Some(round2(debit)),
        breakevens: vec![round2(atm - debit), round2(atm + debit)],
        risk_level: RiskLevel::Medium,
    }
}

fn net_credit(legs: &[StrategyLeg]) -> f64 {
    legs.iter()
        .map(|l| match l.action {
            TradeAction::Sell => l.premium,
            TradeAction::Buy => -l.premium,
        })
        .sum()
}
