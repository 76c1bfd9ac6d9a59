pub mod analysis;
pub mod config;
pub mod error;
pub mod indicators;
pub mod models;
pub mod pricing;
pub mod risk;
pub mod signals;
pub mod strategies;
pub mod symbols;
pub mod telemetry;
#[cfg(test)]
pub mod test_helpers;
pub mod util;
