use serde::{Deserialize, Serialize};

use crate::models::{Bias, Confidence};

/// Which bias/confidence threshold table to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Revision {
    /// Tighter +/-18 bias band.
    Current,
    /// Earlier +/-25 bias band with stricter confidence gates.
    Legacy,
}

impl Revision {
    pub fn from_str_loose(s: &str) -> Option<Revision> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" | "v2" | "18" => Some(Revision::Current),
            "legacy" | "v1" | "25" => Some(Revision::Legacy),
            _ => None,
        }
    }

    pub fn thresholds(self) -> &'static ThresholdSet {
        match self {
            Revision::Current => &CURRENT,
            Revision::Legacy => &LEGACY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub revision: Revision,
    /// |score| at or beyond this band is directional.
    pub bias_band: f64,
    pub high_agreement: f64,
    pub high_score: f64,
    pub high_move: f64,
    pub high_move_score: f64,
    pub medium_agreement: f64,
    pub medium_score: f64,
    pub medium_move: f64,
    pub medium_move_score: f64,
}

pub const CURRENT: ThresholdSet = ThresholdSet {
    revision: Revision::Current,
    bias_band: 18.0,
    high_agreement: 0.65,
    high_score: 42.0,
    high_move: 4.0,
    high_move_score: 30.0,
    medium_agreement: 0.45,
    medium_score: 20.0,
    medium_move: 2.5,
    medium_move_score: 18.0,
};

pub const LEGACY: ThresholdSet = ThresholdSet {
    revision: Revision::Legacy,
    bias_band: 25.0,
    high_agreement: 0.70,
    high_score: 50.0,
    high_move: 4.0,
    high_move_score: 35.0,
    medium_agreement: 0.50,
    medium_score: 25.0,
    medium_move: 2.5,
    medium_move_score: 25.0,
};

impl ThresholdSet {
    pub fn bias_label(&self, score: f64) -> Bias {
        if score >= self.bias_band {
            Bias::Buy
        } else if score <= -self.bias_band {
            Bias::Sell
        } else {
            Bias::Neutral
        }
    }

    /// `agreement` is the share of timeframes agreeing with the overall bias;
    /// `dominant_move` is the larger of the daily and intraday percent moves.
    pub fn confidence(&self, agreement: f64, score: f64, dominant_move: f64) -> Confidence {
        let score = score.abs();
        let moved = dominant_move.abs();

        if (agreement >= self.high_agreement && score >= self.high_score)
            || (moved >= self.high_move && score >= self.high_move_score)
        {
            Confidence::High
        } else if (agreement >= self.medium_agreement && score >= self.medium_score)
            || (moved >= self.medium_move && score >= self.medium_move_score)
        {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}
