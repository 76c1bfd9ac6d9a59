pub mod analyzer;
pub mod cache;
pub mod lots;
pub mod portfolio;

pub use analyzer::{
    AdjustmentRecommendation, MarketSeed, Position, PositionAnalysis, PositionAnalyzer,
    PositionReport,
};
pub use cache::{ChainCache, ChainGreeks, GreeksCache, GreeksProvider, MarketGreeks};
pub use lots::{split_quantity, LotTable, QuantitySplit};
pub use portfolio::PortfolioAnalysis;
