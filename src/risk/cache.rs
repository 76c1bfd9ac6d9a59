use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::models::OptionType;

/// (underlying, expiry) identifying one option chain.
pub type ChainKey = (String, NaiveDate);

/// Market-implied figures for one strike. `iv` is in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketGreeks {
    pub delta: f64,
    pub theta: f64,
    pub iv: Option<f64>,
}

/// Market Greeks for every strike of one chain.
#[derive(Debug, Clone, Default)]
pub struct ChainGreeks {
    /// Underlying price at fetch time, when the provider knows it.
    pub underlying_price: Option<f64>,
    entries: HashMap<(i64, OptionType), MarketGreeks>,
}

fn strike_key(strike: f64) -> i64 {
    (strike * 100.0).round() as i64
}

impl ChainGreeks {
    pub fn new(underlying_price: Option<f64>) -> Self {
        Self {
            underlying_price,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, strike: f64, option_type: OptionType, greeks: MarketGreeks) {
        self.entries.insert((strike_key(strike), option_type), greeks);
    }

    pub fn with(mut self, strike: f64, option_type: OptionType, greeks: MarketGreeks) -> Self {
        self.insert(strike, option_type, greeks);
        self
    }

    pub fn get(&self, strike: f64, option_type: OptionType) -> Option<&MarketGreeks> {
        self.entries.get(&(strike_key(strike), option_type))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of market-implied Greeks, usually a broker or data-vendor API.
#[async_trait]
pub trait GreeksProvider: Send + Sync {
    async fn fetch_chain_greeks(&self, underlying: &str, expiry: NaiveDate) -> Result<ChainGreeks>;
}

/// Shared store of fetched chains. Implementations are consulted and filled by
/// concurrent analyses; a lost race costs at most one redundant fetch.
pub trait ChainCache: Send + Sync {
    /// Fresh entry for `key`, if any.
    fn get(&self, key: &ChainKey, now: Instant) -> Option<Arc<ChainGreeks>>;
    fn insert(&self, key: ChainKey, chain: ChainGreeks, now: Instant);
    fn purge_expired(&self, now: Instant);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Short-lived chain Greeks keyed by (underlying, expiry). Callers pass the clock so
/// expiry is deterministic under test. Locks are held only for the map access,
/// never across a fetch.
#[derive(Debug)]
pub struct GreeksCache {
    ttl: Duration,
    entries: RwLock<HashMap<ChainKey, (Instant, Arc<ChainGreeks>)>>,
}

impl GreeksCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ChainKey, (Instant, Arc<ChainGreeks>)>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ChainKey, (Instant, Arc<ChainGreeks>)>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChainCache for GreeksCache {
    fn get(&self, key: &ChainKey, now: Instant) -> Option<Arc<ChainGreeks>> {
        let entries = self.read();
        let (fetched_at, chain) = entries.get(key)?;
        (now.saturating_duration_since(*fetched_at) < self.ttl).then(|| Arc::clone(chain))
    }

    fn insert(&self, key: ChainKey, chain: ChainGreeks, now: Instant) {
        self.write().insert(key, (now, Arc::new(chain)));
    }

    fn purge_expired(&self, now: Instant) {
        let ttl = self.ttl;
        self.write()
            .retain(|_, (fetched_at, _)| now.saturating_duration_since(*fetched_at) < ttl);
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
