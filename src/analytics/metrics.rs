//! Read-side derivations over the metrics time series: windowed price
//! changes, realized volatility, and per-day bars.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::dates::TRADING_DAYS_PER_YEAR;
use crate::model::MarketSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub latest: MarketSnapshot,
    pub change_5d: f64,
    pub change_5d_pct: f64,
    pub change_30d: f64,
    pub change_30d_pct: f64,
    /// Standard deviation of per-tick percentage changes over 30 days.
    pub volatility_30d: f64,
    pub volatility_30d_annualized: f64,
}

/// One local calendar day of intraday metrics collapsed to a bar.
#[derive(Debug, Clone, Serialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub average: f64,
}

/// Windowed change and volatility summary. `rows` must be ascending by
/// timestamp and should cover the trailing 30 days.
pub fn summarize(rows: &[MarketSnapshot], now: DateTime<Utc>) -> Option<MetricsSummary> {
    let latest = rows.last()?.clone();

    let change_vs = |days: i64| -> (f64, f64) {
        let cutoff = now - Duration::days(days);
        match rows.iter().find(|r| r.timestamp >= cutoff) {
            Some(base) if base.spot_price > 0.0 => {
                let change = latest.spot_price - base.spot_price;
                (change, change / base.spot_price * 100.0)
            }
            _ => (0.0, 0.0),
        }
    };
    let (change_5d, change_5d_pct) = change_vs(5);
    let (change_30d, change_30d_pct) = change_vs(30);

    let cutoff_30d = now - Duration::days(30);
    let pct_changes: Vec<f64> = rows
        .iter()
        .filter(|r| r.timestamp >= cutoff_30d)
        .map(|r| r.price_change_pct)
        .collect();
    let volatility_30d = stddev(&pct_changes);

    Some(MetricsSummary {
        latest,
        change_5d,
        change_5d_pct,
        change_30d,
        change_30d_pct,
        volatility_30d,
        volatility_30d_annualized: volatility_30d * TRADING_DAYS_PER_YEAR.sqrt(),
    })
}

/// Collapse intraday rows into one bar per local calendar day. `rows`
/// must be ascending by timestamp.
pub fn daily_bars(rows: &[MarketSnapshot], tz: Tz) -> Vec<DailyBar> {
    let mut bars: Vec<DailyBar> = Vec::new();
    let mut sum = 0.0;
    let mut count = 0u32;

    for row in rows {
        let date = row.timestamp.with_timezone(&tz).date_naive();
        match bars.last_mut() {
            Some(bar) if bar.date == date => {
                bar.high = bar.high.max(row.spot_price);
                bar.low = bar.low.min(row.spot_price);
                bar.close = row.spot_price;
                sum += row.spot_price;
                count += 1;
                bar.average = sum / count as f64;
            }
            _ => {
                sum = row.spot_price;
                count = 1;
                bars.push(DailyBar {
                    date,
                    open: row.spot_price,
                    high: row.spot_price,
                    low: row.spot_price,
                    close: row.spot_price,
                    average: row.spot_price,
                });
            }
        }
    }
    bars
}

fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
