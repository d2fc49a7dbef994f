//! The read path. `QueryEngine` resolves an optional snapshot timestamp
//! (defaulting to the latest persisted one) and serves aggregations over
//! the store. It is stateless and safe to share; a query racing an
//! in-progress tick simply sees whichever rows are committed.

pub mod gamma;
pub mod metrics;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::dates::{self, ExpiryKind};
use crate::model::{ExpiryGamma, MarketSnapshot, OptionContract, OptionType, StrikeGamma};
use crate::store::Store;

pub use gamma::{CumulativePoint, ExposureSummary, GammaLevels, HorizonBucket};
pub use metrics::{DailyBar, MetricsSummary};

/// Expiries fed into the horizon summary.
const SUMMARY_EXPIRY_LIMIT: usize = 20;
/// Daily bars only make sense once the window spans several days.
const DAILY_BARS_MIN_DAYS: u32 = 5;

/// One expiration's chain at one snapshot, split into sides.
#[derive(Debug, Clone, Serialize)]
pub struct ChainView {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub expiration_date: DateTime<Utc>,
    pub expiry_kind: ExpiryKind,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsHistory {
    pub time_series: Vec<MarketSnapshot>,
    /// Present when the requested window is wide enough for bars.
    pub daily_summary: Option<Vec<DailyBar>>,
}

pub struct QueryEngine {
    store: Store,
    symbol: String,
    timezone: Tz,
}

impl QueryEngine {
    pub fn new(store: Store, symbol: impl Into<String>, timezone: Tz) -> Self {
        QueryEngine {
            store,
            symbol: symbol.into(),
            timezone,
        }
    }

    async fn resolve_timestamp(
        &self,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<DateTime<Utc>>> {
        match at {
            Some(ts) => Ok(Some(ts)),
            None => self
                .store
                .latest_timestamp(&self.symbol)
                .await
                .context("resolving latest snapshot timestamp"),
        }
    }

    pub async fn gamma_by_strike(&self, at: Option<DateTime<Utc>>) -> Result<Vec<StrikeGamma>> {
        let Some(ts) = self.resolve_timestamp(at).await? else {
            return Ok(Vec::new());
        };
        self.store
            .gamma_by_strike(&self.symbol, ts)
            .await
            .context("aggregating gamma by strike")
    }

    pub async fn gamma_by_expiry(
        &self,
        at: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<ExpiryGamma>> {
        let Some(ts) = self.resolve_timestamp(at).await? else {
            return Ok(Vec::new());
        };
        self.store
            .gamma_by_expiry(&self.symbol, ts, limit)
            .await
            .context("aggregating gamma by expiry")
    }

    pub async fn highest_gamma_strikes(
        &self,
        at: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<StrikeGamma>> {
        let Some(ts) = self.resolve_timestamp(at).await? else {
            return Ok(Vec::new());
        };
        self.store
            .highest_gamma_strikes(&self.symbol, ts, limit)
            .await
            .context("ranking strikes by absolute exposure")
    }

    pub async fn gamma_levels(&self, at: Option<DateTime<Utc>>) -> Result<Option<GammaLevels>> {
        let Some(ts) = self.resolve_timestamp(at).await? else {
            return Ok(None);
        };
        let strikes = self
            .store
            .gamma_by_strike(&self.symbol, ts)
            .await
            .context("aggregating gamma by strike")?;
        if strikes.is_empty() {
            return Ok(None);
        }
        Ok(Some(gamma::levels(ts, &strikes)))
    }

    pub async fn exposure_summary(
        &self,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<ExposureSummary>> {
        let Some(ts) = self.resolve_timestamp(at).await? else {
            return Ok(None);
        };
        let by_expiry = self
            .store
            .gamma_by_expiry(&self.symbol, ts, SUMMARY_EXPIRY_LIMIT)
            .await
            .context("aggregating gamma by expiry")?;
        if by_expiry.is_empty() {
            return Ok(None);
        }
        Ok(Some(gamma::horizon_summary(ts, &by_expiry)))
    }

    /// Chain for one expiration, defaulting to the nearest one present at
    /// the snapshot.
    pub async fn options_chain(
        &self,
        expiry: Option<NaiveDate>,
        at: Option<DateTime<Utc>>,
    ) -> Result<Option<ChainView>> {
        let Some(ts) = self.resolve_timestamp(at).await? else {
            return Ok(None);
        };

        let expiration = match expiry {
            Some(date) => dates::market_close(date, self.timezone),
            None => match self
                .store
                .nearest_expiry(&self.symbol, ts)
                .await
                .context("finding nearest expiration")?
            {
                Some(e) => e,
                None => return Ok(None),
            },
        };

        let rows = self
            .store
            .options_chain(&self.symbol, ts, expiration)
            .await
            .context("loading chain rows")?;

        let (calls, puts) = rows
            .into_iter()
            .partition(|r| r.option_type == OptionType::Call);

        Ok(Some(ChainView {
            timestamp: ts,
            symbol: self.symbol.clone(),
            expiration_date: expiration,
            expiry_kind: dates::classify_expiry(expiration, ts, self.timezone),
            calls,
            puts,
        }))
    }

    pub async fn latest_metrics(&self) -> Result<Option<MarketSnapshot>> {
        self.store
            .latest_metrics(&self.symbol)
            .await
            .context("loading latest metrics")
    }

    /// Intraday series for the trailing `days`, with daily bars once the
    /// window is at least five days wide.
    pub async fn historical_metrics(&self, days: u32) -> Result<MetricsHistory> {
        let since = Utc::now() - Duration::days(days as i64);
        let time_series = self
            .store
            .historical_metrics(&self.symbol, since)
            .await
            .context("loading metrics history")?;
        let daily_summary = (days >= DAILY_BARS_MIN_DAYS)
            .then(|| metrics::daily_bars(&time_series, self.timezone));

        Ok(MetricsHistory {
            time_series,
            daily_summary,
        })
    }

    pub async fn metrics_summary(&self) -> Result<Option<MetricsSummary>> {
        let now = Utc::now();
        let rows = self
            .store
            .historical_metrics(&self.symbol, now - Duration::days(30))
            .await
            .context("loading metrics history")?;
        Ok(metrics::summarize(&rows, now))
    }
}
