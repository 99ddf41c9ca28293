use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DateError {
    #[error("Invalid Date '{0}'")]
    Invalid(String),
    #[error("Date '{date}' more than {limit} in future")]
    TooFarInFuture { date: String, limit: String },
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a request date. Offset-less timestamps are UTC; a date alone is
/// midnight UTC. A space may stand in for a URL-decoded `+` in the offset.
pub fn parse_date(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, DateError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    let plus_restored = trimmed.replace(' ', "+");
    let parsed = [trimmed, plus_restored.as_str()]
        .into_iter()
        .find_map(parse_timestamp)
        .ok_or_else(|| DateError::Invalid(input.to_string()));
    parsed
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolve an optional request date (defaulting to `now`) and reject it if
/// it lies more than `max_future` ahead of `now`.
pub fn resolve_request_date(
    input: Option<&str>,
    now: DateTime<Utc>,
    max_future: std::time::Duration,
) -> Result<DateTime<Utc>, DateError> {
    let date = match input {
        Some(s) => parse_date(s, now)?,
        None => now,
    };

    let limit = Duration::from_std(max_future).unwrap_or(Duration::MAX);
    if date - now > limit {
        return Err(DateError::TooFarInFuture {
            date: input.unwrap_or("now").to_string(),
            limit: humantime::format_duration(max_future).to_string(),
        });
    }
    Ok(date)
}
