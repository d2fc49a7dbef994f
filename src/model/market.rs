use chrono::{DateTime, Utc};
use serde::Serialize;

use super::feed::UnderlyingQuote;

/// One per-tick row of underlying market state.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub spot_price: f64,
    pub prev_day_close: f64,
    pub price_change: f64,
    pub price_change_pct: f64,
}

impl MarketSnapshot {
    /// Derive the snapshot from the feed's underlying quote. Missing quote
    /// fields become zeros so a metrics row is always written; downstream
    /// stages treat a non-positive spot as "no usable price".
    pub fn from_feed(quote: &UnderlyingQuote, timestamp: DateTime<Utc>, symbol: &str) -> Self {
        let spot_price = quote.close.unwrap_or(0.0);
        let prev_day_close = quote.prev_close.unwrap_or(0.0);
        let (price_change, price_change_pct) = if prev_day_close > 0.0 {
            let change = spot_price - prev_day_close;
            (change, change / prev_day_close * 100.0)
        } else {
            (0.0, 0.0)
        };

        MarketSnapshot {
            timestamp,
            symbol: symbol.to_string(),
            spot_price,
            prev_day_close,
            price_change,
            price_change_pct,
        }
    }
}
