use serde::{Deserialize, Serialize};
use std::fmt;

/// Chart timeframes the signal engine aggregates, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1M")]
    Month1,
    #[serde(rename = "1W")]
    Week1,
    #[serde(rename = "1D")]
    Day1,
    #[serde(rename = "3H")]
    Hour3,
    #[serde(rename = "1H")]
    Hour1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::Month1,
        Timeframe::Week1,
        Timeframe::Day1,
        Timeframe::Hour3,
        Timeframe::Hour1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Month1 => "1M",
            Timeframe::Week1 => "1W",
            Timeframe::Day1 => "1D",
            Timeframe::Hour3 => "3H",
            Timeframe::Hour1 => "1H",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Timeframe> {
        match s.trim() {
            "1M" | "1mo" | "month" => Some(Timeframe::Month1),
            "1W" | "1w" | "week" => Some(Timeframe::Week1),
            "1D" | "1d" | "day" => Some(Timeframe::Day1),
            "3H" | "3h" => Some(Timeframe::Hour3),
            "1H" | "1h" => Some(Timeframe::Hour1),
            _ => None,
        }
    }

    pub fn is_intraday(&self) -> bool {
        matches!(self, Timeframe::Hour3 | Timeframe::Hour1)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_parsing() {
        assert_eq!(Timeframe::from_str_loose("3h"), Some(Timeframe::Hour3));
        assert_eq!(Timeframe::from_str_loose("1M"), Some(Timeframe::Month1));
        assert_eq!(Timeframe::from_str_loose("5m"), None);
    }

    #[test]
    fn serde_names() {
        let s = serde_json::to_string(&Timeframe::Day1).unwrap();
        assert_eq!(s, "\"1D\"");
    }
}
