//! Exchange option/future identifier decoding.
//!
//! Options look like `NATGAS24DEC350CE`: underlying, a two-digit token, a three-letter
//! month, the strike and `CE`/`PE`. The two-digit token is either the expiry day or a
//! two-digit year; [`resolve_expiry`] holds that policy.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{InstrumentType, OptionType};

/// Day used for monthly contracts when the token encodes a year.
const YEAR_TOKEN_EXPIRY_DAY: u32 = 26;
/// A year token further than this from today is rejected.
const YEAR_WINDOW: i32 = 10;
const EXPIRY_GRACE_HOURS: i64 = 24;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedOption {
    pub underlying_symbol: String,
    pub expiry_date: Option<NaiveDate>,
    pub strike: f64,
    pub option_type: Option<OptionType>,
    pub is_valid: bool,
}

impl ParsedOption {
    pub fn invalid() -> Self {
        Self {
            underlying_symbol: String::new(),
            expiry_date: None,
            strike: 0.0,
            option_type: None,
            is_valid: false,
        }
    }

    /// Underlying, expiry and type for a valid parse.
    pub fn parts(&self) -> Option<(&str, NaiveDate, OptionType)> {
        if !self.is_valid {
            return None;
        }
        Some((
            self.underlying_symbol.as_str(),
            self.expiry_date?,
            self.option_type?,
        ))
    }
}

pub fn month_from_abbrev(s: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(s))
        .map(|i| i as u32 + 1)
}

/// How the two-digit token was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenReading {
    /// Token > 31: only a year is possible.
    Year,
    /// Token could be a day or a year.
    Ambiguous,
}

pub fn classify_token(token: u32) -> TokenReading {
    if token > 31 {
        TokenReading::Year
    } else {
        TokenReading::Ambiguous
    }
}

fn plausible_year(year: i32, today: NaiveDate) -> bool {
    (year - today.year()).abs() <= YEAR_WINDOW
}

/// Every expiry the token could denote, before choosing one.
pub fn expiry_candidates(token: u32, month: u32, today: NaiveDate) -> Vec<NaiveDate> {
    let token_year = 2000 + token as i32;
    let year_candidate = plausible_year(token_year, today)
        .then(|| NaiveDate::from_ymd_opt(token_year, month, YEAR_TOKEN_EXPIRY_DAY))
        .flatten();

    match classify_token(token) {
        TokenReading::Year => year_candidate.into_iter().collect(),
        TokenReading::Ambiguous => {
            let this_year = today.year();
            [
                NaiveDate::from_ymd_opt(this_year, month, token),
                NaiveDate::from_ymd_opt(this_year + 1, month, token),
                year_candidate,
            ]
            .into_iter()
            .flatten()
            .collect()
        }
    }
}

/// Pick the expiry for a token. Prefers the nearest candidate that has not expired by
/// more than the 24h grace window; otherwise the most recent past candidate.
pub fn resolve_expiry(token: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let candidates = expiry_candidates(token, month, today);
    let cutoff = today - Duration::hours(EXPIRY_GRACE_HOURS);

    candidates
        .iter()
        .copied()
        .filter(|d| *d >= cutoff)
        .min_by_key(|d| (*d - today).num_days().abs())
        .or_else(|| candidates.iter().copied().max())
}

/// Decode an option identifier. Malformed input yields [`ParsedOption::invalid`].
pub fn parse_option_symbol(raw: &str, today: NaiveDate) -> ParsedOption {
    parse_parts(raw, today).unwrap_or_else(ParsedOption::invalid)
}

fn parse_parts(raw: &str, today: NaiveDate) -> Option<ParsedOption> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.len() < 3 || !symbol.is_ascii() {
        return None;
    }

    let (body, suffix) = symbol.split_at(symbol.len() - 2);
    let option_type = OptionType::from_suffix(suffix)?;

    let strike_start = body
        .rfind(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map(|i| i + 1)?;
    let strike: f64 = body[strike_start..].parse().ok()?;
    if !strike.is_finite() || strike <= 0.0 {
        return None;
    }

    let head = &body[..strike_start];
    if head.len() < 6 {
        return None;
    }
    let (prefix, month_str) = head.split_at(head.len() - 3);
    let month = month_from_abbrev(month_str)?;

    let (underlying, token_str) = prefix.split_at(prefix.len() - 2);
    if underlying.is_empty()
        || !underlying.chars().all(|c| c.is_ascii_alphabetic())
        || !token_str.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let token: u32 = token_str.parse().ok()?;
    let expiry = resolve_expiry(token, month, today)?;

    Some(ParsedOption {
        underlying_symbol: underlying.to_string(),
        expiry_date: Some(expiry),
        strike,
        option_type: Some(option_type),
        is_valid: true,
    })
}

pub fn is_future_symbol(raw: &str) -> bool {
    raw.trim().to_ascii_uppercase().ends_with("FUT")
}

/// Option if the parser accepts it, future on a FUT suffix, otherwise other.
pub fn classify_instrument(raw: &str, today: NaiveDate) -> (InstrumentType, ParsedOption) {
    let parsed = parse_option_symbol(raw, today);
    let kind = if parsed.is_valid {
        InstrumentType::Option
    } else if is_future_symbol(raw) {
        InstrumentType::Future
    } else {
        InstrumentType::Other
    };
    (kind, parsed)
}
