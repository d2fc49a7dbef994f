//! Pure aggregation math over per-strike and per-expiry sums. Everything
//! here is deterministic over its inputs so it can be tested without a
//! store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ExpiryGamma, StrikeGamma};

/// Running total of exposure walking strikes in ascending order.
#[derive(Debug, Clone, Serialize)]
pub struct CumulativePoint {
    pub strike_price: f64,
    pub cumulative_gamma_exposure: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GammaLevels {
    pub timestamp: DateTime<Utc>,
    pub zero_gamma_level: Option<f64>,
    pub total_gamma_exposure: f64,
    pub top_positive_strikes: Vec<StrikeGamma>,
    pub top_negative_strikes: Vec<StrikeGamma>,
    pub cumulative: Vec<CumulativePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HorizonBucket {
    pub gamma_exposure: f64,
    /// Share of total absolute exposure, in percent. Zero when there is
    /// no exposure at all.
    pub share_pct: f64,
}

/// Exposure split into expiry horizons relative to the snapshot instant.
#[derive(Debug, Clone, Serialize)]
pub struct ExposureSummary {
    pub timestamp: DateTime<Utc>,
    pub total_gamma_exposure: f64,
    /// Expiries up to 7 days out.
    pub near_term: HorizonBucket,
    /// Expiries between 7 and 30 days out.
    pub mid_term: HorizonBucket,
    /// Expiries beyond 30 days.
    pub long_term: HorizonBucket,
}

pub fn cumulative_exposure(strikes: &[StrikeGamma]) -> Vec<CumulativePoint> {
    let mut running = 0.0;
    strikes
        .iter()
        .map(|s| {
            running += s.total_gamma_exposure;
            CumulativePoint {
                strike_price: s.strike_price,
                cumulative_gamma_exposure: running,
            }
        })
        .collect()
}

/// Strike where the cumulative exposure walk crosses zero, linearly
/// interpolated between the first adjacent pair with opposite signs.
/// Boundary zeros count as crossings; with a zero denominator the
/// midpoint stands in. Only the first crossing is reported.
pub fn zero_gamma_level(cumulative: &[CumulativePoint]) -> Option<f64> {
    for pair in cumulative.windows(2) {
        let (s1, g1) = (pair[0].strike_price, pair[0].cumulative_gamma_exposure);
        let (s2, g2) = (pair[1].strike_price, pair[1].cumulative_gamma_exposure);
        if g1 * g2 <= 0.0 {
            if g1 == g2 {
                return Some((s1 + s2) / 2.0);
            }
            return Some(s1 + (s2 - s1) * (-g1) / (g2 - g1));
        }
    }
    None
}

/// Key levels for one snapshot: the zero-gamma strike plus the five
/// largest positive and negative strikes by absolute exposure.
pub fn levels(asof: DateTime<Utc>, strikes: &[StrikeGamma]) -> GammaLevels {
    let cumulative = cumulative_exposure(strikes);
    let zero_gamma_level = zero_gamma_level(&cumulative);
    let total_gamma_exposure = strikes.iter().map(|s| s.total_gamma_exposure).sum();

    let mut ranked: Vec<&StrikeGamma> = strikes.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_gamma_exposure
            .abs()
            .total_cmp(&a.total_gamma_exposure.abs())
            .then(a.strike_price.total_cmp(&b.strike_price))
    });

    let top_positive_strikes = ranked
        .iter()
        .filter(|s| s.total_gamma_exposure > 0.0)
        .take(5)
        .map(|s| (*s).clone())
        .collect();
    let top_negative_strikes = ranked
        .iter()
        .filter(|s| s.total_gamma_exposure < 0.0)
        .take(5)
        .map(|s| (*s).clone())
        .collect();

    GammaLevels {
        timestamp: asof,
        zero_gamma_level,
        total_gamma_exposure,
        top_positive_strikes,
        top_negative_strikes,
        cumulative,
    }
}

/// Partition per-expiry sums into horizons measured from the snapshot
/// instant, with each bucket's share of total absolute exposure.
pub fn horizon_summary(asof: DateTime<Utc>, by_expiry: &[ExpiryGamma]) -> ExposureSummary {
    let mut near = 0.0;
    let mut mid = 0.0;
    let mut long = 0.0;

    for row in by_expiry {
        let days_out = (row.expiration_date - asof).num_seconds() as f64 / 86_400.0;
        if days_out <= 7.0 {
            near += row.total_gamma_exposure;
        } else if days_out <= 30.0 {
            mid += row.total_gamma_exposure;
        } else {
            long += row.total_gamma_exposure;
        }
    }

    let denom = near.abs() + mid.abs() + long.abs();
    let share = |value: f64| {
        if denom > 0.0 {
            value.abs() / denom * 100.0
        } else {
            0.0
        }
    };

    ExposureSummary {
        timestamp: asof,
        total_gamma_exposure: near + mid + long,
        near_term: HorizonBucket {
            gamma_exposure: near,
            share_pct: share(near),
        },
        mid_term: HorizonBucket {
            gamma_exposure: mid,
            share_pct: share(mid),
        },
        long_term: HorizonBucket {
            gamma_exposure: long,
            share_pct: share(long),
        },
    }
}
