#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use natgas_signals::models::{Candle, CandleSeries, OptionType, Timeframe};
use natgas_signals::risk::{ChainGreeks, GreeksProvider, MarketGreeks, Position};

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-12-02T03:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Steady trend: each candle opens `step` from the last and closes 80% of the way to
/// the next open.
pub fn make_trend(count: usize, interval: Duration, start: f64, step: f64) -> CandleSeries {
    let base = base_time();
    let candles: Vec<Candle> = (0..count)
        .map(|i| {
            let open = start + i as f64 * step;
            let close = open + step * 0.8;
            Candle {
                time: base + interval * i as i32,
                open,
                high: open.max(close) + step.abs() * 0.2,
                low: open.min(close) - step.abs() * 0.1,
                close,
                volume: 1000.0,
            }
        })
        .collect();
    CandleSeries::new(candles)
}

fn interval(tf: Timeframe) -> Duration {
    match tf {
        Timeframe::Month1 => Duration::days(30),
        Timeframe::Week1 => Duration::weeks(1),
        Timeframe::Day1 => Duration::days(1),
        Timeframe::Hour3 => Duration::hours(3),
        Timeframe::Hour1 => Duration::hours(1),
    }
}

/// The same trend on every timeframe.
pub fn all_timeframes(count: usize, start: f64, step: f64) -> HashMap<Timeframe, CandleSeries> {
    Timeframe::ALL
        .iter()
        .map(|&tf| (tf, make_trend(count, interval(tf), start, step)))
        .collect()
}

pub fn position(symbol: &str, quantity: i64, avg: f64, ltp: f64) -> Position {
    Position {
        trading_symbol: symbol.to_string(),
        quantity,
        average_price: avg,
        last_price: ltp,
        pnl: (ltp - avg) * quantity as f64,
        multiplier: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Provider serving fixed Greeks and counting fetches.
pub struct MockGreeksProvider {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub underlying_price: Option<f64>,
    pub strikes: Vec<(f64, OptionType, MarketGreeks)>,
}

impl MockGreeksProvider {
    pub fn new(strikes: Vec<(f64, OptionType, MarketGreeks)>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            underlying_price: None,
            strikes,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GreeksProvider for MockGreeksProvider {
    async fn fetch_chain_greeks(
        &self,
        underlying: &str,
        _expiry: NaiveDate,
    ) -> Result<ChainGreeks> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("option chain unavailable for {}", underlying);
        }
        let mut chain = ChainGreeks::new(self.underlying_price);
        for (strike, kind, greeks) in &self.strikes {
            chain.insert(*strike, *kind, *greeks);
        }
        Ok(chain)
    }
}
