use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::cache::{ChainCache, ChainGreeks, ChainKey, GreeksCache, GreeksProvider};
use super::lots::{split_quantity, LotTable};
use super::portfolio::{aggregate, PortfolioAnalysis};
use crate::config::Config;
use crate::models::{
    AdjustmentAction, InstrumentType, MarketCondition, OptionType, RiskLevel, Urgency,
};
use crate::pricing::{black_scholes, time_to_expiry_years, GreeksInput};
use crate::symbols::classify_instrument;
use crate::util::{round2, round4};

pub const CRITICAL_LOSS_PCT: f64 = -15.0;
pub const HIGH_LOSS_PCT: f64 = -10.0;
pub const MEDIUM_LOSS_PCT: f64 = -5.0;
/// Raw broker quantity above which a volatile market makes a position critical.
pub const VOLATILE_QUANTITY_LIMIT: i64 = 1000;
pub const SHORT_PROFIT_EXIT_PCT: f64 = 90.0;
pub const REDUCE_PROFIT_PCT: f64 = 50.0;
pub const HEDGE_DELTA: f64 = 0.6;

/// Broker position record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub trading_symbol: String,
    /// Signed; negative is short.
    pub quantity: i64,
    pub average_price: f64,
    pub last_price: f64,
    pub pnl: f64,
    /// Broker-reported contract multiplier.
    #[serde(default)]
    pub multiplier: Option<f64>,
}

impl Position {
    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }
}

/// Live market context for a batch of positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSeed {
    pub underlying_price: f64,
    pub condition: MarketCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GreeksSource {
    /// Delta and theta from the market, the rest from Black-Scholes.
    Market,
    Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
    pub source: GreeksSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecommendation {
    pub action: AdjustmentAction,
    pub reason: String,
    pub urgency: Urgency,
    pub suggested_quantity: Option<i64>,
    pub target_price: Option<f64>,
}

impl AdjustmentRecommendation {
    pub fn new(action: AdjustmentAction, urgency: Urgency, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
            urgency,
            suggested_quantity: None,
            target_price: None,
        }
    }

    pub fn quantity(mut self, lots: i64) -> Self {
        self.suggested_quantity = Some(lots);
        self
    }

    pub fn target(mut self, price: f64) -> Self {
        self.target_price = Some(round2(price));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionAnalysis {
    pub symbol: String,
    pub quantity: i64,
    pub quantity_units: i64,
    pub number_of_lots: i64,
    pub lot_size: u32,
    pub instrument_type: InstrumentType,
    pub avg_price: f64,
    pub ltp: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub risk_level: RiskLevel,
    pub greeks: Option<PositionGreeks>,
    pub is_itm: Option<bool>,
    pub recommendations: Vec<AdjustmentRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    pub positions: Vec<PositionAnalysis>,
    pub portfolio: PortfolioAnalysis,
}

/// Percent gain relative to the entry direction.
pub fn pnl_percent(avg_price: f64, ltp: f64, short: bool) -> f64 {
    if avg_price <= 0.0 {
        return 0.0;
    }
    let change = if short { avg_price - ltp } else { ltp - avg_price };
    change / avg_price * 100.0
}

pub fn risk_level(
    pnl_pct: f64,
    quantity: i64,
    short: bool,
    itm: bool,
    condition: MarketCondition,
) -> RiskLevel {
    let volatile = condition == MarketCondition::Volatile;
    if pnl_pct < CRITICAL_LOSS_PCT || (volatile && quantity.abs() > VOLATILE_QUANTITY_LIMIT) {
        RiskLevel::Critical
    } else if pnl_pct < HIGH_LOSS_PCT || (short && itm) {
        RiskLevel::High
    } else if pnl_pct < MEDIUM_LOSS_PCT {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Inputs of the adjustment cascade for one position.
#[derive(Debug, Clone, Copy)]
pub struct CascadeInput {
    pub short: bool,
    pub itm: bool,
    pub pnl_percent: f64,
    pub delta: Option<f64>,
    pub lots: i64,
    pub strike: Option<f64>,
    pub option_type: Option<OptionType>,
    pub strike_step: f64,
}

/// First matching rule wins.
pub fn adjustment(input: &CascadeInput) -> AdjustmentRecommendation {
    let lots = input.lots.abs();
    let pnl = input.pnl_percent;

    if input.short && input.itm {
        let mut rec = AdjustmentRecommendation::new(
            AdjustmentAction::Roll,
            Urgency::High,
            "Short option is in the money; roll out to a further OTM strike",
        )
        .quantity(lots);
        if let (Some(strike), Some(kind)) = (input.strike, input.option_type) {
            let step = 2.0 * input.strike_step;
            rec = rec.target(match kind {
                OptionType::Call => strike + step,
                OptionType::Put => strike - step,
            });
        }
        return rec;
    }
    if input.short && pnl > SHORT_PROFIT_EXIT_PCT {
        return AdjustmentRecommendation::new(
            AdjustmentAction::Exit,
            Urgency::High,
            format!("Captured {:.1}% of the premium; little left to earn", pnl),
        )
        .quantity(lots);
    }
    if pnl < CRITICAL_LOSS_PCT {
        return AdjustmentRecommendation::new(
            AdjustmentAction::Exit,
            Urgency::High,
            format!("Loss of {:.1}% breaches the {:.0}% stop", pnl.abs(), CRITICAL_LOSS_PCT.abs()),
        )
        .quantity(lots);
    }
    if let Some(delta) = input.delta.filter(|d| input.short && d.abs() > HEDGE_DELTA) {
        let hedge_lots = ((delta.abs() * lots as f64).round() as i64).max(1);
        return AdjustmentRecommendation::new(
            AdjustmentAction::Hedge,
            Urgency::Medium,
            format!(
                "Short option delta {:.2} exceeds {:.1}; hedge with futures",
                delta, HEDGE_DELTA
            ),
        )
        .quantity(hedge_lots);
    }
    if pnl > REDUCE_PROFIT_PCT {
        return AdjustmentRecommendation::new(
            AdjustmentAction::Reduce,
            Urgency::Low,
            format!("Up {:.1}%; book partial profit", pnl),
        )
        .quantity((lots / 2).max(1));
    }
    AdjustmentRecommendation::new(AdjustmentAction::Hold, Urgency::Low, "Within risk limits")
}

/// Per-position analysis shared state: lot table and pricing defaults.
#[derive(Debug, Clone)]
pub struct PositionContext {
    pub lots: LotTable,
    pub cfg: Config,
}

impl PositionContext {
    pub fn new(cfg: &Config) -> Self {
        Self {
            lots: LotTable::from_config(cfg),
            cfg: cfg.clone(),
        }
    }

    pub fn analyze_position(
        &self,
        position: &Position,
        seed: &MarketSeed,
        chain: Option<&ChainGreeks>,
        now: DateTime<Utc>,
    ) -> PositionAnalysis {
        let today = now.with_timezone(&self.cfg.market_tz).date_naive();
        let (instrument_type, parsed) = classify_instrument(&position.trading_symbol, today);
        let lot_size = self.lots.lot_size(&position.trading_symbol, position.multiplier);
        let split = split_quantity(position.quantity, lot_size);
        let short = position.is_short();

        let underlying = chain
            .and_then(|c| c.underlying_price)
            .filter(|p| *p > 0.0)
            .unwrap_or(seed.underlying_price);

        let option = parsed.parts().map(|(_, expiry, kind)| (expiry, kind, parsed.strike));
        let (greeks, itm) = match option {
            Some((expiry, kind, strike)) if instrument_type == InstrumentType::Option => {
                let greeks = self.option_greeks(underlying, strike, expiry, kind, chain, now);
                let itm = (underlying > 0.0).then(|| match kind {
                    OptionType::Call => underlying > strike,
                    OptionType::Put => underlying < strike,
                });
                (Some(greeks), itm)
            }
            _ => (None, None),
        };

        let pnl_pct = pnl_percent(position.average_price, position.last_price, short);
        let itm_flag = itm.unwrap_or(false);
        let risk = risk_level(pnl_pct, position.quantity, short, itm_flag, seed.condition);
        let rec = adjustment(&CascadeInput {
            short,
            itm: itm_flag,
            pnl_percent: pnl_pct,
            delta: greeks.map(|g| g.delta),
            lots: split.number_of_lots,
            strike: option.map(|o| o.2),
            option_type: option.map(|o| o.1),
            strike_step: self.cfg.strike_step,
        });

        debug!(
            "{} {} lots={} pnl={:.2}% risk={} -> {}",
            position.trading_symbol,
            instrument_type,
            split.number_of_lots,
            pnl_pct,
            risk,
            rec.action
        );

        PositionAnalysis {
            symbol: position.trading_symbol.clone(),
            quantity: position.quantity,
            quantity_units: split.quantity_units,
            number_of_lots: split.number_of_lots,
            lot_size,
            instrument_type,
            avg_price: round2(position.average_price),
            ltp: round2(position.last_price),
            pnl: round2(position.pnl),
            pnl_percent: round2(pnl_pct),
            risk_level: risk,
            greeks,
            is_itm: itm,
            recommendations: vec![rec],
        }
    }

    fn option_greeks(
        &self,
        underlying: f64,
        strike: f64,
        expiry: NaiveDate,
        kind: OptionType,
        chain: Option<&ChainGreeks>,
        now: DateTime<Utc>,
    ) -> PositionGreeks {
        let t = time_to_expiry_years(expiry, now, self.cfg.market_tz, self.cfg.market_close);
        let market = chain.and_then(|c| c.get(strike, kind)).copied();
        let input = GreeksInput::with_defaults(&self.cfg, underlying, strike, t, kind)
            .with_iv(market.and_then(|m| m.iv).map(|iv| iv / 100.0));
        let model = black_scholes(&input);

        match market {
            Some(m) => PositionGreeks {
                delta: round4(m.delta),
                gamma: model.gamma,
                theta: round4(m.theta),
                vega: model.vega,
                rho: model.rho,
                source: GreeksSource::Market,
            },
            None => PositionGreeks {
                delta: model.delta,
                gamma: model.gamma,
                theta: model.theta,
                vega: model.vega,
                rho: model.rho,
                source: GreeksSource::Model,
            },
        }
    }
}

fn option_chain_key(symbol: &str, today: NaiveDate) -> Option<ChainKey> {
    let (kind, parsed) = classify_instrument(symbol, today);
    if kind != InstrumentType::Option {
        return None;
    }
    let (underlying, expiry, _) = parsed.parts()?;
    Some((underlying.to_string(), expiry))
}

/// Analyzes position batches, fetching market Greeks per unique (underlying, expiry)
/// concurrently and falling back to Black-Scholes on any failure. Shareable across
/// tasks; the cache is the only mutable state.
pub struct PositionAnalyzer {
    ctx: PositionContext,
    provider: Option<Arc<dyn GreeksProvider>>,
    cache: Arc<dyn ChainCache>,
}

impl PositionAnalyzer {
    pub fn new(cfg: &Config, provider: Option<Arc<dyn GreeksProvider>>) -> Self {
        let cache = Arc::new(GreeksCache::new(cfg.greeks_cache_ttl));
        Self::with_cache(cfg, provider, cache)
    }

    /// Uses a caller-owned cache, e.g. one shared between analyzers.
    pub fn with_cache(
        cfg: &Config,
        provider: Option<Arc<dyn GreeksProvider>>,
        cache: Arc<dyn ChainCache>,
    ) -> Self {
        Self {
            ctx: PositionContext::new(cfg),
            provider,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<dyn ChainCache> {
        &self.cache
    }

    pub async fn analyze(
        &self,
        positions: &[Position],
        seed: &MarketSeed,
        now: DateTime<Utc>,
    ) -> PositionReport {
        self.analyze_at(positions, seed, now, Instant::now()).await
    }

    /// As `analyze`, with `clock` driving cache freshness.
    pub async fn analyze_at(
        &self,
        positions: &[Position],
        seed: &MarketSeed,
        now: DateTime<Utc>,
        clock: Instant,
    ) -> PositionReport {
        let today = now.with_timezone(&self.ctx.cfg.market_tz).date_naive();
        self.cache.purge_expired(clock);

        let keys: HashSet<ChainKey> = positions
            .iter()
            .filter_map(|p| option_chain_key(&p.trading_symbol, today))
            .collect();
        self.fetch_missing(&keys, clock).await;

        let chains: HashMap<ChainKey, Arc<ChainGreeks>> = keys
            .into_iter()
            .filter_map(|k| self.cache.get(&k, clock).map(|c| (k, c)))
            .collect();

        let analyses: Vec<PositionAnalysis> = positions
            .iter()
            .map(|p| {
                let chain = option_chain_key(&p.trading_symbol, today).and_then(|k| chains.get(&k));
                self.ctx.analyze_position(p, seed, chain.map(|c| &**c), now)
            })
            .collect();

        let portfolio = aggregate(&analyses, &self.ctx.cfg, now);
        info!(
            "Analyzed {} positions: net delta {:.2}, net theta {:.2}, {} recommendation(s)",
            analyses.len(),
            portfolio.net_delta,
            portfolio.net_theta,
            portfolio.recommendations.len()
        );

        PositionReport {
            positions: analyses,
            portfolio,
        }
    }

    async fn fetch_missing(&self, keys: &HashSet<ChainKey>, clock: Instant) {
        let Some(provider) = self.provider.clone() else {
            return;
        };

        let mut set = JoinSet::new();
        for key in keys {
            if self.cache.get(key, clock).is_some() {
                continue;
            }
            let provider = Arc::clone(&provider);
            let key = key.clone();
            set.spawn(async move {
                let result = provider.fetch_chain_greeks(&key.0, key.1).await;
                (key, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((key, Ok(chain))) => {
                    debug!("Fetched {} Greeks for {} {}", chain.len(), key.0, key.1);
                    self.cache.insert(key, chain, clock);
                }
                Ok((key, Err(e))) => {
                    warn!(
                        "Greeks fetch failed for {} {}: {:#}; using Black-Scholes",
                        key.0, key.1, e
                    );
                }
                Err(e) => warn!("Greeks fetch task failed: {}; using Black-Scholes", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 10, 6, 0, 0).unwrap()
    }

    fn seed(price: f64) -> MarketSeed {
        MarketSeed {
            underlying_price: price,
            condition: MarketCondition::Ranging,
        }
    }

    fn position(symbol: &str, quantity: i64, avg: f64, ltp: f64) -> Position {
        Position {
            trading_symbol: symbol.to_string(),
            quantity,
            average_price: avg,
            last_price: ltp,
            pnl: 0.0,
            multiplier: None,
        }
    }

    #[test]
    fn pnl_percent_by_direction() {
        assert!((pnl_percent(100.0, 120.0, false) - 20.0).abs() < 1e-9);
        assert!((pnl_percent(100.0, 120.0, true) + 20.0).abs() < 1e-9);
        assert_eq!(pnl_percent(0.0, 10.0, false), 0.0);
    }

    #[test]
    fn risk_tiers() {
        use MarketCondition::*;
        assert_eq!(risk_level(-16.0, 1, false, false, Ranging), RiskLevel::Critical);
        assert_eq!(risk_level(0.0, -1250, true, false, Volatile), RiskLevel::Critical);
        assert_eq!(risk_level(0.0, -1250, true, false, Trending), RiskLevel::Low);
        assert_eq!(risk_level(-11.0, 1, false, false, Ranging), RiskLevel::High);
        assert_eq!(risk_level(5.0, -1, true, true, Ranging), RiskLevel::High);
        assert_eq!(risk_level(-6.0, 1, false, false, Ranging), RiskLevel::Medium);
        assert_eq!(risk_level(-5.0, 1, false, false, Ranging), RiskLevel::Low);
    }

    #[test]
    fn cascade_order() {
        let base = CascadeInput {
            short: true,
            itm: true,
            pnl_percent: -80.0,
            delta: Some(-0.95),
            lots: -2,
            strike: Some(350.0),
            option_type: Some(OptionType::Put),
            strike_step: 5.0,
        };
        let roll = adjustment(&base);
        assert_eq!(roll.action, AdjustmentAction::Roll);
        assert_eq!(roll.urgency, Urgency::High);
        assert_eq!(roll.suggested_quantity, Some(2));
        assert_eq!(roll.target_price, Some(340.0));

        let exit_profit = adjustment(&CascadeInput { itm: false, pnl_percent: 95.0, ..base });
        assert_eq!(exit_profit.action, AdjustmentAction::Exit);

        let exit_loss = adjustment(&CascadeInput {
            itm: false,
            short: false,
            pnl_percent: -20.0,
            ..base
        });
        assert_eq!((exit_loss.action, exit_loss.urgency), (AdjustmentAction::Exit, Urgency::High));

        let hedge = adjustment(&CascadeInput {
            itm: false,
            pnl_percent: 0.0,
            delta: Some(0.7),
            ..base
        });
        assert_eq!((hedge.action, hedge.urgency), (AdjustmentAction::Hedge, Urgency::Medium));
        assert_eq!(hedge.suggested_quantity, Some(1));

        let reduce = adjustment(&CascadeInput {
            itm: false,
            pnl_percent: 60.0,
            delta: Some(0.2),
            ..base
        });
        assert_eq!((reduce.action, reduce.urgency), (AdjustmentAction::Reduce, Urgency::Low));

        let hold = adjustment(&CascadeInput { itm: false, pnl_percent: 10.0, delta: None, ..base });
        assert_eq!(hold.action, AdjustmentAction::Hold);
    }

    #[test]
    fn short_deep_itm_call_rolls() {
        let ctx = PositionContext::new(&Config::default());
        // Sold at 10, now 18: 80% loss with the underlying far above the strike.
        let p = position("NATGAS24DEC300CE", -2500, 10.0, 18.0);
        let a = ctx.analyze_position(&p, &seed(380.0), None, now());
        assert_eq!(a.instrument_type, InstrumentType::Option);
        assert_eq!(a.is_itm, Some(true));
        assert_eq!(a.pnl_percent, -80.0);
        assert_eq!(a.risk_level, RiskLevel::Critical);
        assert_eq!(a.recommendations[0].action, AdjustmentAction::Roll);
        assert_eq!(a.recommendations[0].urgency, Urgency::High);
        assert_eq!(a.number_of_lots, -2);
        assert_eq!(a.quantity_units, -2500);
        let g = a.greeks.unwrap();
        assert_eq!(g.source, GreeksSource::Model);
        assert!(g.delta > 0.9);
    }

    #[test]
    fn market_greeks_override_delta_and_theta() {
        use super::super::cache::MarketGreeks;
        let ctx = PositionContext::new(&Config::default());
        let chain = ChainGreeks::new(Some(305.0)).with(
            320.0,
            OptionType::Call,
            MarketGreeks {
                delta: 0.31,
                theta: -0.45,
                iv: Some(55.0),
            },
        );
        let p = position("NATGAS24DEC320CE", 2, 8.0, 9.0);
        let a = ctx.analyze_position(&p, &seed(300.0), Some(&chain), now());
        let g = a.greeks.unwrap();
        assert_eq!(g.source, GreeksSource::Market);
        assert_eq!(g.delta, 0.31);
        assert_eq!(g.theta, -0.45);
        assert!(g.gamma > 0.0 && g.vega > 0.0);
        assert_eq!(a.is_itm, Some(false));
        assert_eq!(a.number_of_lots, 2);
        assert_eq!(a.quantity_units, 2500);
    }

    #[test]
    fn futures_and_other_instruments() {
        let ctx = PositionContext::new(&Config::default());
        let fut_position = position("NATGAS24DECFUT", 1250, 300.0, 310.0);
        let fut = ctx.analyze_position(&fut_position, &seed(310.0), None, now());
        assert_eq!(fut.instrument_type, InstrumentType::Future);
        assert!(fut.greeks.is_none());
        assert!(fut.is_itm.is_none());
        assert_eq!(fut.number_of_lots, 1);

        let equity = position("RELIANCE", 10, 100.0, 100.0);
        let other = ctx.analyze_position(&equity, &seed(0.0), None, now());
        assert_eq!(other.instrument_type, InstrumentType::Other);
        assert_eq!(other.recommendations[0].action, AdjustmentAction::Hold);
    }
}
