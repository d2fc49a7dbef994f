use tracing::debug;

use crate::model::StrikeRecord;

/// Retain strikes within `[spot * (1 - range), spot * (1 + range)]`,
/// bounds inclusive.
///
/// The band is volume control, not a correctness gate: with an unusable
/// spot or a degenerate range the full chain passes through unchanged.
pub fn filter_by_range(
    records: Vec<StrikeRecord>,
    spot_price: f64,
    range_percent: f64,
) -> Vec<StrikeRecord> {
    if !(spot_price > 0.0)
        || !spot_price.is_finite()
        || !range_percent.is_finite()
        || range_percent < 0.0
    {
        return records;
    }

    let lower = spot_price * (1.0 - range_percent);
    let upper = spot_price * (1.0 + range_percent);
    debug!(lower, upper, "strike band");

    records
        .into_iter()
        .filter(|r| r.strike_price >= lower && r.strike_price <= upper)
        .collect()
}
