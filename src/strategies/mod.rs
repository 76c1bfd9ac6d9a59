pub mod builders;
pub mod chain;
pub mod selector;

pub use builders::{StrategyKind, StrategyLeg};
pub use chain::{ChainRow, OptionChainAnalysis};
pub use selector::{IvRegime, PcrSkew, SelectionContext, StrategyRecommendation, StrategySelector};
