//! Relative timeframes such as `7d`, `24h`, `2 weeks`, or `today`.
//!
//! A timeframe is turned into an absolute `since` cutoff relative to `now`.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::error::ContextError;

/// Resolve `text` to the cutoff `now - span`.
///
/// Months are 30 days. Whitespace between amount and unit is optional.
pub fn parse_timeframe(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ContextError> {
    let normalized = text.trim().to_ascii_lowercase();
    let invalid = || ContextError::InvalidTimeframe(text.to_string());

    if normalized == "today" {
        return Ok(now.date_naive().and_time(NaiveTime::MIN).and_utc());
    }

    let digits_end = normalized
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(normalized.len());
    let (amount, unit) = normalized.split_at(digits_end);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;

    let span = match unit.trim() {
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(amount),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(amount),
        "d" | "day" | "days" => Duration::try_days(amount),
        "w" | "week" | "weeks" => Duration::try_weeks(amount),
        "mo" | "month" | "months" => amount.checked_mul(30).and_then(Duration::try_days),
        _ => None,
    }
    .ok_or_else(invalid)?;

    now.checked_sub_signed(span).ok_or_else(invalid)
}
