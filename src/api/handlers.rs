//! Thin pass-throughs: parse parameters, call the engine, map errors.

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::analytics::{ChainView, ExposureSummary, GammaLevels, MetricsHistory, MetricsSummary};
use crate::model::{ExpiryGamma, MarketSnapshot, StrikeGamma};

use super::error::ApiError;
use super::state::AppState;

const DEFAULT_LIMIT: usize = 10;
const DEFAULT_HISTORY_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RankedQuery {
    pub timestamp: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChainQuery {
    pub timestamp: Option<String>,
    /// Expiration date, `YYYY-MM-DD`.
    pub expiry: Option<String>,
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| {
                ApiError::BadRequest(format!("invalid timestamp '{s}', expected RFC 3339"))
            }),
    }
}

fn parse_expiry(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid expiry '{s}', expected YYYY-MM-DD"))),
    }
}

pub async fn latest_metrics(
    State(state): State<AppState>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    let snapshot = state
        .engine
        .latest_metrics()
        .await?
        .ok_or_else(|| ApiError::NotFound("no market metrics recorded".into()))?;
    Ok(Json(snapshot))
}

pub async fn metrics_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MetricsHistory>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    Ok(Json(state.engine.historical_metrics(days).await?))
}

pub async fn metrics_summary(
    State(state): State<AppState>,
) -> Result<Json<MetricsSummary>, ApiError> {
    let summary = state
        .engine
        .metrics_summary()
        .await?
        .ok_or_else(|| ApiError::NotFound("no market metrics recorded".into()))?;
    Ok(Json(summary))
}

pub async fn gamma_by_strike(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<Vec<StrikeGamma>>, ApiError> {
    let at = parse_timestamp(query.timestamp.as_deref())?;
    Ok(Json(state.engine.gamma_by_strike(at).await?))
}

pub async fn gamma_by_expiry(
    State(state): State<AppState>,
    Query(query): Query<RankedQuery>,
) -> Result<Json<Vec<ExpiryGamma>>, ApiError> {
    let at = parse_timestamp(query.timestamp.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.engine.gamma_by_expiry(at, limit).await?))
}

pub async fn highest_gamma_strikes(
    State(state): State<AppState>,
    Query(query): Query<RankedQuery>,
) -> Result<Json<Vec<StrikeGamma>>, ApiError> {
    let at = parse_timestamp(query.timestamp.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.engine.highest_gamma_strikes(at, limit).await?))
}

pub async fn gamma_levels(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<GammaLevels>, ApiError> {
    let at = parse_timestamp(query.timestamp.as_deref())?;
    let levels = state
        .engine
        .gamma_levels(at)
        .await?
        .ok_or_else(|| ApiError::NotFound("no gamma exposure data available".into()))?;
    Ok(Json(levels))
}

pub async fn exposure_summary(
    State(state): State<AppState>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<ExposureSummary>, ApiError> {
    let at = parse_timestamp(query.timestamp.as_deref())?;
    let summary = state
        .engine
        .exposure_summary(at)
        .await?
        .ok_or_else(|| ApiError::NotFound("no gamma exposure data available".into()))?;
    Ok(Json(summary))
}

pub async fn options_chain(
    State(state): State<AppState>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<ChainView>, ApiError> {
    let at = parse_timestamp(query.timestamp.as_deref())?;
    let expiry = parse_expiry(query.expiry.as_deref())?;
    let chain = state
        .engine
        .options_chain(expiry, at)
        .await?
        .ok_or_else(|| ApiError::NotFound("no options data available".into()))?;
    Ok(Json(chain))
}
