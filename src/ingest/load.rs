use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{MarketSnapshot, OptionContract, OptionType, StrikeRecord};
use crate::store::Store;

#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing to persist. Reported as a failure so the tick does not
    /// silently count as progress.
    #[error("no contract rows to load")]
    EmptyBatch,
    #[error("database write failed: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Expand strike records into one row per leg, skipping legs the feed
/// left unidentified.
pub fn contract_rows(
    records: &[StrikeRecord],
    timestamp: DateTime<Utc>,
    symbol: &str,
) -> Vec<OptionContract> {
    let mut rows = Vec::with_capacity(records.len() * 2);
    for record in records {
        for (option_type, leg) in [
            (OptionType::Call, &record.call),
            (OptionType::Put, &record.put),
        ] {
            if leg.option_symbol.is_empty() {
                continue;
            }
            rows.push(OptionContract {
                timestamp,
                symbol: symbol.to_string(),
                option_type,
                option_symbol: leg.option_symbol.clone(),
                expiration_date: record.expiration_date,
                strike_price: record.strike_price,
                iv: leg.iv,
                delta: leg.delta,
                gamma: leg.gamma,
                open_interest: leg.open_interest,
                volume: leg.volume,
                gamma_exposure: leg.gamma_exposure,
                time_till_exp: record.time_till_exp,
            });
        }
    }
    rows
}

/// Idempotent upsert of the per-tick metrics row.
pub async fn load_market_snapshot(
    store: &Store,
    snapshot: &MarketSnapshot,
) -> Result<(), LoadError> {
    store.upsert_market_snapshot(snapshot).await?;
    Ok(())
}

/// Idempotent upsert of the contract batch. Not transactionally linked to
/// the metrics upsert; a partial tick stays partial.
pub async fn load_contracts(store: &Store, rows: &[OptionContract]) -> Result<usize, LoadError> {
    if rows.is_empty() {
        return Err(LoadError::EmptyBatch);
    }
    Ok(store.upsert_contracts(rows).await?)
}
