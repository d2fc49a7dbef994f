use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "CALL",
            OptionType::Put => "PUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CALL" => Some(OptionType::Call),
            "PUT" => Some(OptionType::Put),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side (call or put) of a strike, as normalized from the feed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptionLeg {
    pub option_symbol: String,
    pub iv: f64,
    pub delta: f64,
    pub gamma: f64,
    pub open_interest: i64,
    pub volume: i64,
    /// None until the exposure stage runs, and stays None when spot is
    /// unusable. Never conflate with zero.
    pub gamma_exposure: Option<f64>,
}

/// Normalized per-strike record pairing both legs, the unit of work for
/// the exposure and filter stages.
#[derive(Debug, Clone, Serialize)]
pub struct StrikeRecord {
    pub strike_price: f64,
    pub expiration_date: DateTime<Utc>,
    /// Year fraction of trading days until expiration.
    pub time_till_exp: f64,
    pub call: OptionLeg,
    pub put: OptionLeg,
    /// Display aggregate in billions, rounded to two decimals.
    pub total_gamma_exposure: Option<f64>,
}

/// One persisted contract row, keyed by (timestamp, option_symbol).
#[derive(Debug, Clone, Serialize)]
pub struct OptionContract {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub option_type: OptionType,
    pub option_symbol: String,
    pub expiration_date: DateTime<Utc>,
    pub strike_price: f64,
    pub iv: f64,
    pub delta: f64,
    pub gamma: f64,
    pub open_interest: i64,
    pub volume: i64,
    pub gamma_exposure: Option<f64>,
    pub time_till_exp: f64,
}

/// Per-strike aggregate over one snapshot. Derived, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct StrikeGamma {
    pub strike_price: f64,
    pub call_gamma_exposure: f64,
    pub put_gamma_exposure: f64,
    pub total_gamma_exposure: f64,
    pub earliest_expiry: DateTime<Utc>,
    pub latest_expiry: DateTime<Utc>,
}

/// Per-expiry aggregate over one snapshot. Derived, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryGamma {
    pub expiration_date: DateTime<Utc>,
    pub call_gamma_exposure: f64,
    pub put_gamma_exposure: f64,
    pub total_gamma_exposure: f64,
    pub call_open_interest: i64,
    pub put_open_interest: i64,
}
