use anyhow::{Context, Result, bail};
use chrono_tz::Tz;

pub const DEFAULT_FEED_BASE_URL: &str =
    "https://cdn.cboe.com/api/global/delayed_quotes/options/";
pub const DEFAULT_SYMBOL: &str = "_SPX";

/// Runtime settings shared by the ingest pipeline and the read API.
#[derive(Debug, Clone)]
pub struct Settings {
    pub feed_base_url: String,
    pub symbol: String,
    /// Fraction of spot retained on each side by the strike range filter.
    pub range_percent: f64,
    pub interval_minutes: u64,
    /// Timezone used for expiry anchoring and trading-day math.
    pub timezone: Tz,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            range_percent: 0.10,
            interval_minutes: 15,
            timezone: chrono_tz::America::New_York,
        }
    }
}

impl Settings {
    /// Build settings from `GEXFLOW_*` environment variables, falling back
    /// to defaults. Malformed values are startup errors.
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(v) = env_var("GEXFLOW_FEED_BASE_URL") {
            settings.feed_base_url = v;
        }
        if let Some(v) = env_var("GEXFLOW_SYMBOL") {
            settings.symbol = v;
        }
        if let Some(v) = env_var("GEXFLOW_STRIKE_RANGE") {
            let range: f64 = v
                .parse()
                .with_context(|| format!("invalid GEXFLOW_STRIKE_RANGE '{v}'"))?;
            if !range.is_finite() || range < 0.0 {
                bail!("GEXFLOW_STRIKE_RANGE must be a non-negative fraction, got '{v}'");
            }
            settings.range_percent = range;
        }
        if let Some(v) = env_var("GEXFLOW_INTERVAL_MINUTES") {
            let minutes: u64 = v
                .parse()
                .with_context(|| format!("invalid GEXFLOW_INTERVAL_MINUTES '{v}'"))?;
            if minutes == 0 {
                bail!("GEXFLOW_INTERVAL_MINUTES must be at least 1");
            }
            settings.interval_minutes = minutes;
        }
        if let Some(v) = env_var("GEXFLOW_TIMEZONE") {
            settings.timezone = v
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid GEXFLOW_TIMEZONE '{v}': {e}"))?;
        }

        Ok(settings)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
