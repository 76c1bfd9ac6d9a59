pub mod greeks;

pub use greeks::{black_scholes, time_to_expiry_years, Greeks, GreeksInput};
