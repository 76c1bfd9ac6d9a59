//! Contract lot sizes and the lots/units quantity heuristic.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Symbol-prefix lot sizes, checked longest prefix first so `NATGASMINI` wins over
/// `NATGAS`.
#[derive(Debug, Clone)]
pub struct LotTable {
    entries: Vec<(String, u32)>,
    default_lot_size: u32,
}

impl LotTable {
    pub fn new(mut entries: Vec<(String, u32)>, default_lot_size: u32) -> Self {
        for (prefix, _) in &mut entries {
            *prefix = prefix.to_ascii_uppercase();
        }
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            entries,
            default_lot_size: default_lot_size.max(1),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.lot_sizes.clone(), cfg.default_lot_size)
    }

    /// Table entry, else the broker multiplier, else the default.
    pub fn lot_size(&self, symbol: &str, broker_multiplier: Option<f64>) -> u32 {
        let symbol = symbol.trim().to_ascii_uppercase();
        if let Some((_, size)) = self.entries.iter().find(|(p, _)| symbol.starts_with(p.as_str())) {
            return *size;
        }
        match broker_multiplier {
            Some(m) if m.is_finite() && m >= 1.0 => m.round() as u32,
            _ => self.default_lot_size,
        }
    }

    pub fn default_lot_size(&self) -> u32 {
        self.default_lot_size
    }
}

/// How a broker quantity was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityScale {
    /// Quantity was already in units.
    Units,
    /// Not a multiple of the lot size, so assumed to already be in lots.
    Lots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitySplit {
    pub number_of_lots: i64,
    pub quantity_units: i64,
    pub scale: QuantityScale,
}

/// Splits a signed broker quantity into lots and units. A quantity divisible by the
/// lot size is taken as units; anything else is assumed to be a lot count. Either way
/// `quantity_units == number_of_lots * lot_size` with the sign preserved.
pub fn split_quantity(quantity: i64, lot_size: u32) -> QuantitySplit {
    let lot = i64::from(lot_size.max(1));
    if lot == 1 || quantity % lot == 0 {
        QuantitySplit {
            number_of_lots: quantity / lot,
            quantity_units: quantity,
            scale: QuantityScale::Units,
        }
    } else {
        QuantitySplit {
            number_of_lots: quantity,
            quantity_units: quantity.saturating_mul(lot),
            scale: QuantityScale::Lots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let table = LotTable::from_config(&Config::default());
        assert_eq!(table.lot_size("NATGASMINI24DEC350CE", None), 250);
        assert_eq!(table.lot_size("natgas24dec350ce", None), 1250);
        assert_eq!(table.lot_size("CRUDEOILM25JANFUT", None), 10);
        assert_eq!(table.lot_size("CRUDEOIL25JANFUT", None), 100);
    }

    #[test]
    fn falls_back_to_multiplier_then_default() {
        let table = LotTable::from_config(&Config::default());
        assert_eq!(table.lot_size("GOLDM25FEBFUT", Some(10.0)), 10);
        assert_eq!(table.lot_size("GOLDM25FEBFUT", Some(0.0)), 1250);
        assert_eq!(table.lot_size("GOLDM25FEBFUT", None), 1250);
    }

    #[test]
    fn divisible_quantity_is_units() {
        let s = split_quantity(-2500, 1250);
        assert_eq!(s.number_of_lots, -2);
        assert_eq!(s.quantity_units, -2500);
        assert_eq!(s.scale, QuantityScale::Units);
    }

    #[test]
    fn indivisible_quantity_is_lots() {
        let s = split_quantity(3, 1250);
        assert_eq!(s.number_of_lots, 3);
        assert_eq!(s.quantity_units, 3750);
        assert_eq!(s.scale, QuantityScale::Lots);
    }

    #[test]
    fn units_equal_lots_times_size() {
        for lot in [10u32, 100, 250, 1250] {
            for q in [-5000i64, -1251, -7, -1, 0, 1, 3, 250, 1250, 2501, 12500] {
                let s = split_quantity(q, lot);
                assert_eq!(s.quantity_units, s.number_of_lots * i64::from(lot), "q={q} lot={lot}");
                assert_eq!(s.quantity_units.signum(), q.signum());
            }
        }
    }
}
