//! The write path. One `Pipeline::run_tick` call walks the stage sequence
//! fetch, normalize, compute exposure, filter, load metrics, load
//! contracts. Each stage hands a `Result` to the orchestrator; the first
//! failure ends the tick with the stage attached.

pub mod exposure;
pub mod fetch;
pub mod filter;
pub mod load;
pub mod normalize;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

use crate::config::Settings;
use crate::model::MarketSnapshot;
use crate::store::Store;

pub use exposure::compute_exposure;
pub use fetch::{FetchError, Fetcher};
pub use filter::filter_by_range;
pub use load::{LoadError, contract_rows, load_contracts, load_market_snapshot};
pub use normalize::{NormalizedChain, ProcessingError, normalize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Normalize,
    ComputeExposure,
    FilterStrikes,
    LoadMetrics,
    LoadContracts,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::ComputeExposure => "compute_exposure",
            Stage::FilterStrikes => "filter_strikes",
            Stage::LoadMetrics => "load_metrics",
            Stage::LoadContracts => "load_contracts",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tick. The two load stages are reported separately because
/// their upserts are independent.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("normalize failed: {0}")]
    Normalize(#[from] ProcessingError),
    #[error("metrics load failed: {0}")]
    LoadMetrics(LoadError),
    #[error("contract load failed: {0}")]
    LoadContracts(LoadError),
}

impl TickError {
    pub fn stage(&self) -> Stage {
        match self {
            TickError::Fetch(_) => Stage::Fetch,
            TickError::Normalize(_) => Stage::Normalize,
            TickError::LoadMetrics(_) => Stage::LoadMetrics,
            TickError::LoadContracts(_) => Stage::LoadContracts,
        }
    }
}

/// What a successful tick did, for the scheduler's log line.
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub timestamp: DateTime<Utc>,
    pub spot_price: f64,
    pub strikes: usize,
    pub retained: usize,
    pub contracts: usize,
}

/// Per-tick orchestrator. Owns its collaborators; holds no state across
/// ticks.
pub struct Pipeline {
    fetcher: Fetcher,
    store: Store,
    symbol: String,
    range_percent: f64,
    timezone: Tz,
}

impl Pipeline {
    pub fn new(settings: &Settings, store: Store) -> Result<Self> {
        Ok(Pipeline {
            fetcher: Fetcher::new(settings)?,
            store,
            symbol: settings.symbol.clone(),
            range_percent: settings.range_percent,
            timezone: settings.timezone,
        })
    }

    /// Swap in a differently tuned fetcher (tests shrink retry pacing).
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Run one full ingestion tick. Safe to re-run for the same snapshot;
    /// every write is an upsert on identity keys.
    pub async fn run_tick(&self) -> Result<TickSummary, TickError> {
        debug!(stage = %Stage::Fetch, "tick stage");
        let payload = self.fetcher.fetch(None).await?;

        debug!(stage = %Stage::Normalize, "tick stage");
        let chain = normalize(&payload, Utc::now(), self.timezone)?;
        let snapshot = MarketSnapshot::from_feed(&payload.data.option, chain.timestamp, &self.symbol);

        let mut records = chain.records;
        let strikes = records.len();

        debug!(stage = %Stage::ComputeExposure, "tick stage");
        compute_exposure(&mut records, snapshot.spot_price);

        debug!(stage = %Stage::FilterStrikes, "tick stage");
        let records = filter_by_range(records, snapshot.spot_price, self.range_percent);
        debug!(retained = records.len(), of = strikes, "strike range applied");

        debug!(stage = %Stage::LoadMetrics, "tick stage");
        load_market_snapshot(&self.store, &snapshot)
            .await
            .map_err(TickError::LoadMetrics)?;

        debug!(stage = %Stage::LoadContracts, "tick stage");
        let rows = contract_rows(&records, chain.timestamp, &self.symbol);
        let contracts = load_contracts(&self.store, &rows)
            .await
            .map_err(TickError::LoadContracts)?;

        Ok(TickSummary {
            timestamp: chain.timestamp,
            spot_price: snapshot.spot_price,
            strikes,
            retained: records.len(),
            contracts,
        })
    }
}
