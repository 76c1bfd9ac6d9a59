pub mod candle;
pub mod labels;
pub mod timeframe;

pub use candle::{Candle, CandleSeries};
pub use labels::*;
pub use timeframe::Timeframe;
