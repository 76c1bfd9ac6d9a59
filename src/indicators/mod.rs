pub mod levels;
pub mod momentum;
pub mod moving_average;
pub mod snapshot;
pub mod trend;
pub mod volatility;

pub use levels::{fibonacci_retracement, pivot_points, vwap, FibLevel, PivotLevels};
pub use momentum::{macd, rsi, stochastic, MacdSeries, StochasticSeries};
pub use moving_average::{ema, sma};
pub use snapshot::IndicatorValues;
pub use trend::{adx, AdxSeries};
pub use volatility::{atr, bollinger, true_range, Bands};
