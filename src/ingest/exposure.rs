use crate::model::StrikeRecord;

/// Shares per contract for standard equity-index options.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Compute dealer gamma exposure per leg, in place.
///
///   call =  gamma * open_interest * 100 * spot^2 / 100
///   put  = -gamma * open_interest * 100 * spot^2 / 100
///
/// Calls carry positive sign, puts negative. The per-strike total is
/// restated in billions and rounded to two decimals; leg values stay raw.
/// A non-positive or non-finite spot leaves every field `None`.
pub fn compute_exposure(records: &mut [StrikeRecord], spot_price: f64) {
    if !(spot_price > 0.0) || !spot_price.is_finite() {
        return;
    }

    let scale = CONTRACT_MULTIPLIER * (spot_price * spot_price / 100.0);
    for record in records {
        let call = record.call.gamma * record.call.open_interest as f64 * scale;
        let put = -1.0 * record.put.gamma * record.put.open_interest as f64 * scale;
        record.call.gamma_exposure = Some(call);
        record.put.gamma_exposure = Some(put);
        record.total_gamma_exposure = Some(round2((call + put) / 1e9));
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
