use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::analyzer::{AdjustmentRecommendation, PositionAnalysis};
use crate::config::Config;
use crate::models::{AdjustmentAction, InstrumentType, RiskLevel, Urgency};
use crate::util::round2;

/// Net delta beyond this many default lots triggers a hedge.
pub const HEDGE_LOT_MULTIPLE: f64 = 2.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    /// Delta in underlying units.
    pub net_delta: f64,
    pub net_theta: f64,
    /// Theta accrued until the next market open.
    pub day_decay: f64,
    pub next_open: Option<DateTime<Utc>>,
    pub recommendations: Vec<AdjustmentRecommendation>,
}

/// Next `open` (local hour, minute) strictly after `now`, skipping Saturday and Sunday.
pub fn next_market_open(now: DateTime<Utc>, tz: Tz, open: (u32, u32)) -> Option<DateTime<Utc>> {
    let open_time = NaiveTime::from_hms_opt(open.0, open.1, 0)?;
    let local = now.with_timezone(&tz);
    let mut day = local.date_naive();
    if local.time() >= open_time {
        day = day.succ_opt()?;
    }
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day.succ_opt()?;
    }
    tz.from_local_datetime(&day.and_time(open_time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fraction of a day (possibly more than one) until `next_open`.
pub fn days_until(now: DateTime<Utc>, next_open: DateTime<Utc>) -> f64 {
    let secs = (next_open - now).num_seconds().max(0);
    secs as f64 / SECONDS_PER_DAY
}

pub fn net_delta(positions: &[PositionAnalysis]) -> f64 {
    positions
        .iter()
        .map(|p| match (p.instrument_type, &p.greeks) {
            (InstrumentType::Future, _) => p.quantity_units as f64,
            (InstrumentType::Option, Some(g)) => {
                g.delta * p.number_of_lots as f64 * f64::from(p.lot_size)
            }
            _ => 0.0,
        })
        .sum()
}

/// Sum of per-unit option theta times signed lots.
pub fn net_theta(positions: &[PositionAnalysis]) -> f64 {
    positions
        .iter()
        .filter(|p| p.instrument_type == InstrumentType::Option)
        .filter_map(|p| p.greeks.map(|g| g.theta * p.number_of_lots as f64))
        .sum()
}

pub fn aggregate(
    positions: &[PositionAnalysis],
    cfg: &Config,
    now: DateTime<Utc>,
) -> PortfolioAnalysis {
    let delta = net_delta(positions);
    let theta = net_theta(positions);
    let next_open = next_market_open(now, cfg.market_tz, cfg.market_open);
    let day_decay = next_open.map_or(0.0, |open| theta * days_until(now, open));

    PortfolioAnalysis {
        net_delta: round2(delta),
        net_theta: round2(theta),
        day_decay: round2(day_decay),
        next_open,
        recommendations: portfolio_recommendations(positions, delta, cfg.default_lot_size),
    }
}

fn portfolio_recommendations(
    positions: &[PositionAnalysis],
    net_delta: f64,
    default_lot_size: u32,
) -> Vec<AdjustmentRecommendation> {
    let mut recs = Vec::new();
    let lot = f64::from(default_lot_size.max(1));

    if net_delta.abs() > HEDGE_LOT_MULTIPLE * lot {
        let lots = (net_delta / lot).round() as i64;
        recs.push(
            AdjustmentRecommendation::new(
                AdjustmentAction::Hedge,
                Urgency::Medium,
                format!(
                    "Net delta {:.0} is over {:.0} lots; {} {} futures lot(s) to flatten",
                    net_delta,
                    HEDGE_LOT_MULTIPLE,
                    if lots > 0 { "sell" } else { "buy" },
                    lots.abs()
                ),
            )
            .quantity(-lots),
        );
    }

    let critical: Vec<&str> = positions
        .iter()
        .filter(|p| p.risk_level == RiskLevel::Critical)
        .map(|p| p.symbol.as_str())
        .collect();
    if !critical.is_empty() {
        recs.push(AdjustmentRecommendation::new(
            AdjustmentAction::Reduce,
            Urgency::High,
            format!("Critical risk in {}", critical.join(", ")),
        ));
    }

    if recs.is_empty() {
        recs.push(AdjustmentRecommendation::new(
            AdjustmentAction::Hold,
            Urgency::Low,
            "Portfolio exposure within limits",
        ));
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::analyzer::{GreeksSource, PositionGreeks};

    fn ist(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        chrono_tz::Asia::Kolkata
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn analysis(
        kind: InstrumentType,
        lots: i64,
        lot_size: u32,
        delta: f64,
        theta: f64,
    ) -> PositionAnalysis {
        PositionAnalysis {
            symbol: "NATGAS24DEC300CE".to_string(),
            quantity: lots * i64::from(lot_size),
            quantity_units: lots * i64::from(lot_size),
            number_of_lots: lots,
            lot_size,
            instrument_type: kind,
            avg_price: 10.0,
            ltp: 10.0,
            pnl: 0.0,
            pnl_percent: 0.0,
            risk_level: RiskLevel::Low,
            greeks: (kind == InstrumentType::Option).then_some(PositionGreeks {
                delta,
                gamma: 0.01,
                theta,
                vega: 0.2,
                rho: 0.05,
                source: GreeksSource::Model,
            }),
            is_itm: None,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn next_open_same_day_and_after_close() {
        let tz = chrono_tz::Asia::Kolkata;
        // Tuesday 07:00 IST -> 09:00 same day
        let open = next_market_open(ist(2024, 12, 10, 7, 0), tz, (9, 0)).unwrap();
        assert_eq!(open, ist(2024, 12, 10, 9, 0));
        // Tuesday 23:45 IST -> Wednesday 09:00
        let open = next_market_open(ist(2024, 12, 10, 23, 45), tz, (9, 0)).unwrap();
        assert_eq!(open, ist(2024, 12, 11, 9, 0));
    }

    #[test]
    fn next_open_skips_weekend() {
        let tz = chrono_tz::Asia::Kolkata;
        // Friday 2024-12-13 23:30 IST -> Monday 2024-12-16 09:00
        let now = ist(2024, 12, 13, 23, 30);
        let open = next_market_open(now, tz, (9, 0)).unwrap();
        assert_eq!(open, ist(2024, 12, 16, 9, 0));
        assert!((days_until(now, open) - (57.5 / 24.0)).abs() < 1e-9);
    }

    #[test]
    fn net_greeks() {
        let positions = vec![
            analysis(InstrumentType::Option, -2, 1250, 0.4, -0.5),
            analysis(InstrumentType::Future, 1, 1250, 0.0, 0.0),
            analysis(InstrumentType::Other, 5, 1, 0.0, 0.0),
        ];
        assert!((net_delta(&positions) - (-1000.0 + 1250.0)).abs() < 1e-9);
        assert!((net_theta(&positions) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn day_decay_spans_to_next_open() {
        let cfg = Config::default();
        let positions = vec![analysis(InstrumentType::Option, 4, 1250, 0.3, -0.6)];
        // Tuesday 21:00 IST, 12 hours to the open
        let p = aggregate(&positions, &cfg, ist(2024, 12, 10, 21, 0));
        assert_eq!(p.net_theta, -2.4);
        assert_eq!(p.day_decay, -1.2);
        assert_eq!(p.recommendations[0].action, AdjustmentAction::Hold);
    }

    #[test]
    fn large_delta_and_critical_positions_flagged() {
        let cfg = Config::default();
        let mut positions = vec![
            analysis(InstrumentType::Future, 3, 1250, 0.0, 0.0),
            analysis(InstrumentType::Option, 2, 1250, 0.5, -0.2),
        ];
        positions[1].risk_level = RiskLevel::Critical;
        let p = aggregate(&positions, &cfg, ist(2024, 12, 10, 12, 0));
        assert_eq!(p.net_delta, 5000.0);
        let hedge = &p.recommendations[0];
        assert_eq!(hedge.action, AdjustmentAction::Hedge);
        assert_eq!(hedge.suggested_quantity, Some(-4));
        assert_eq!(p.recommendations[1].action, AdjustmentAction::Reduce);
    }
}
