use thiserror::Error;

use crate::models::Timeframe;

/// Configuration mistakes. These are the only fatal errors the engines raise;
/// missing or short market data always degrades to absent values instead.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("timeframe weight table is empty")]
    EmptyWeightTable,

    #[error("weight for {timeframe} must be finite and positive, got {weight}")]
    InvalidWeight { timeframe: Timeframe, weight: f64 },

    #[error("{name} must be finite and positive, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("market open {open:?} must precede market close {close:?}")]
    InvalidSession { open: (u32, u32), close: (u32, u32) },
}
