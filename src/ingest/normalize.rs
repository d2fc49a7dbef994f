use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

use crate::dates;
use crate::model::{ChainData, ChainPayload, OptionLeg, OptionQuote, StrikeRecord};

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("chain payload contains no strike entries")]
    EmptyChain,
    #[error("unparseable snapshot timestamp '{raw}'")]
    InvalidTimestamp { raw: String },
}

/// Output of the normalize stage: the resolved snapshot instant plus one
/// record per surviving strike, sorted by (expiration, strike).
#[derive(Debug, Clone)]
pub struct NormalizedChain {
    pub timestamp: DateTime<Utc>,
    pub records: Vec<StrikeRecord>,
}

/// Turn a raw payload into sorted strike records.
///
/// Entries with a missing or unparseable expiry are dropped, as are
/// contracts already expired at the snapshot instant. Expirations anchor
/// at market close in `tz`. `now` is only the fallback when the payload
/// carries no timestamp.
pub fn normalize(
    payload: &ChainPayload,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<NormalizedChain, ProcessingError> {
    let timestamp = snapshot_timestamp(&payload.data, now)?;
    let asof_date = timestamp.with_timezone(&tz).date_naive();

    let mut entries = 0usize;
    let mut dropped = 0usize;
    let mut records = Vec::new();

    for group in &payload.data.options {
        for entry in &group.strikes {
            entries += 1;

            let Some(raw_expiry) = entry.expiry.as_deref() else {
                dropped += 1;
                continue;
            };
            let Ok(expiry_date) = NaiveDate::parse_from_str(raw_expiry, "%Y-%m-%d") else {
                dropped += 1;
                continue;
            };

            let expiration = dates::market_close(expiry_date, tz);
            if expiration <= timestamp {
                dropped += 1;
                continue;
            }

            records.push(StrikeRecord {
                strike_price: entry.strike,
                expiration_date: expiration,
                time_till_exp: dates::year_fraction(asof_date, expiry_date),
                call: leg(&entry.call),
                put: leg(&entry.put),
                total_gamma_exposure: None,
            });
        }
    }

    if entries == 0 {
        return Err(ProcessingError::EmptyChain);
    }

    records.sort_by(|a, b| {
        a.expiration_date
            .cmp(&b.expiration_date)
            .then(a.strike_price.total_cmp(&b.strike_price))
    });

    debug!(entries, dropped, kept = records.len(), "chain normalized");
    Ok(NormalizedChain { timestamp, records })
}

fn leg(quote: &OptionQuote) -> OptionLeg {
    OptionLeg {
        option_symbol: quote.option_symbol(),
        iv: quote.iv,
        delta: quote.delta,
        gamma: quote.gamma,
        open_interest: quote.open_interest,
        volume: quote.volume,
        gamma_exposure: None,
    }
}

fn snapshot_timestamp(
    data: &ChainData,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ProcessingError> {
    let Some(raw) = data.timestamp.as_deref() else {
        return Ok(now);
    };

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Some feeds omit the offset; treat those as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|_| ProcessingError::InvalidTimestamp { raw: raw.to_string() })
}
