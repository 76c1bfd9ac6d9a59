pub mod engine;
pub mod futures;
pub mod overall;
pub mod rules;
pub mod thresholds;
pub mod timeframe;

pub use engine::{SignalEngine, SignalReport};
pub use futures::{FuturesSetup, LeanSource};
pub use overall::{OverallAssessment, OverallSignal, ScoreOverride};
pub use rules::IndicatorSignal;
pub use thresholds::{Revision, ThresholdSet};
pub use timeframe::TimeframeSignal;
