//! Wire types for the delayed-quote chain feed. Numeric fields arrive as
//! JSON numbers or numeric strings depending on the endpoint, so every
//! numeric field goes through a lenient deserializer.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct ChainPayload {
    #[serde(default)]
    pub data: ChainData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainData {
    /// Snapshot instant reported by the feed, RFC 3339.
    pub timestamp: Option<String>,
    /// Quote for the underlying instrument.
    #[serde(default)]
    pub option: UnderlyingQuote,
    #[serde(default)]
    pub options: Vec<ExpiryGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnderlyingQuote {
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub close: Option<f64>,
    #[serde(rename = "prevClose", default, deserialize_with = "de_opt_f64")]
    pub prev_close: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpiryGroup {
    #[serde(default)]
    pub strikes: Vec<StrikeEntry>,
}

/// One strike row pairing the call and put quotes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrikeEntry {
    #[serde(default, deserialize_with = "de_f64")]
    pub strike: f64,
    /// Expiration date, `YYYY-MM-DD`.
    pub expiry: Option<String>,
    #[serde(default)]
    pub call: OptionQuote,
    #[serde(default)]
    pub put: OptionQuote,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionQuote {
    #[serde(default)]
    pub option_root: String,
    #[serde(default)]
    pub option_ext: String,
    #[serde(default, deserialize_with = "de_f64")]
    pub iv: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub delta: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub gamma: f64,
    #[serde(default, deserialize_with = "de_i64")]
    pub open_interest: i64,
    #[serde(default, deserialize_with = "de_i64")]
    pub volume: i64,
}

impl OptionQuote {
    /// Full contract identifier, root plus extension.
    pub fn option_symbol(&self) -> String {
        format!("{}{}", self.option_root, self.option_ext)
    }
}

// ── Lenient numeric parsing ──────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Num(f64),
    Str(String),
}

fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(RawNumber::Num(n)) => Ok(n),
        Some(RawNumber::Str(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(0.0)
            } else {
                trimmed
                    .parse()
                    .map_err(|_| serde::de::Error::custom(format!("invalid number {s:?}")))
            }
        }
    }
}

fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawNumber::Num(n)) => Ok(Some(n)),
        Some(RawNumber::Str(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed
                    .parse()
                    .map(Some)
                    .map_err(|_| serde::de::Error::custom(format!("invalid number {s:?}")))
            }
        }
    }
}

fn de_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawNumber>::deserialize(deserializer)? {
        None => Ok(0),
        Some(RawNumber::Num(n)) => Ok(n as i64),
        Some(RawNumber::Str(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map_err(|_| serde::de::Error::custom(format!("invalid integer {s:?}")))
        }
    }
}
