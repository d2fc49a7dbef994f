//! Trading-calendar helpers. Weekday counting stands in for a full
//! exchange holiday calendar.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Count weekdays in `(start, end]`. A same-day range counts zero.
pub fn weekdays_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end <= start {
        return 0;
    }
    let total = (end - start).num_days();
    let full_weeks = (total / 7) as u32;
    let mut count = full_weeks * 5;

    let mut day = start + chrono::Duration::days(total - total % 7);
    while day < end {
        day += chrono::Duration::days(1);
        if day.weekday().num_days_from_monday() < 5 {
            count += 1;
        }
    }
    count
}

/// Time to expiration as a year fraction of trading days, floored at
/// one session so same-day contracts keep a non-zero lifetime.
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> f64 {
    weekdays_between(start, end).max(1) as f64 / TRADING_DAYS_PER_YEAR
}

/// 16:00 local on the given date (market close), as a UTC instant.
pub fn market_close(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let close = NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN);
    let naive = NaiveDateTime::new(date, close);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Standard monthly expiration day: the third Friday of the month.
pub fn is_third_friday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Fri && (15..=21).contains(&date.day())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExpiryKind {
    #[serde(rename = "0DTE")]
    ZeroDte,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "other")]
    Other,
}

/// Label an expiration relative to a snapshot instant. Third-Friday dates
/// are monthly regardless of how close they are.
pub fn classify_expiry(expiration: DateTime<Utc>, asof: DateTime<Utc>, tz: Tz) -> ExpiryKind {
    let expiry_date = expiration.with_timezone(&tz).date_naive();
    if is_third_friday(expiry_date) {
        return ExpiryKind::Monthly;
    }

    let days_out = (expiration - asof).num_seconds() as f64 / 86_400.0;
    if days_out < 1.0 {
        return ExpiryKind::ZeroDte;
    }

    let asof_date = asof.with_timezone(&tz).date_naive();
    if weekdays_between(asof_date, expiry_date) <= 5 {
        ExpiryKind::Weekly
    } else {
        ExpiryKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekday_count_excludes_start_includes_end() {
        // Mon 2023-05-01 to Fri 2023-05-19: three full trading weeks minus
        // the starting Monday.
        assert_eq!(weekdays_between(d(2023, 5, 1), d(2023, 5, 19)), 14);
        // Friday to the following Monday crosses only one session.
        assert_eq!(weekdays_between(d(2023, 5, 5), d(2023, 5, 8)), 1);
        // Friday to Saturday crosses none.
        assert_eq!(weekdays_between(d(2023, 5, 5), d(2023, 5, 6)), 0);
        assert_eq!(weekdays_between(d(2023, 5, 1), d(2023, 5, 1)), 0);
    }

    #[test]
    fn year_fraction_floors_at_one_session() {
        assert!((year_fraction(d(2023, 5, 1), d(2023, 5, 1)) - 1.0 / 252.0).abs() < 1e-12);
        assert!((year_fraction(d(2023, 5, 1), d(2023, 5, 19)) - 14.0 / 252.0).abs() < 1e-12);
    }

    #[test]
    fn third_friday_detection() {
        assert!(is_third_friday(d(2023, 5, 19)));
        assert!(!is_third_friday(d(2023, 5, 12)));
        assert!(!is_third_friday(d(2023, 5, 18)));
    }

    #[test]
    fn expiry_classification() {
        let tz = chrono_tz::America::New_York;
        let asof = Utc.with_ymd_and_hms(2023, 5, 1, 15, 0, 0).unwrap();

        // Same-day close is under a day out.
        assert_eq!(
            classify_expiry(market_close(d(2023, 5, 1), tz), asof, tz),
            ExpiryKind::ZeroDte
        );
        // Friday of the same week.
        assert_eq!(
            classify_expiry(market_close(d(2023, 5, 5), tz), asof, tz),
            ExpiryKind::Weekly
        );
        // Third Friday wins over the distance-based labels.
        assert_eq!(
            classify_expiry(market_close(d(2023, 5, 19), tz), asof, tz),
            ExpiryKind::Monthly
        );
        assert_eq!(
            classify_expiry(market_close(d(2023, 6, 30), tz), asof, tz),
            ExpiryKind::Other
        );
    }
}
