//! Date/time parsing utilities
//!
//! Expiration and not-before dates are given either as ISO 8601 dates or
//! as durations relative to now.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::{Result, VaultEditError};

fn relative_duration_regex() -> &'static Regex {
    static RELATIVE: OnceLock<Regex> = OnceLock::new();
    RELATIVE.get_or_init(|| Regex::new(r"^(\d+)([ymdhw]|min)$").expect("duration regex is valid"))
}

/// Parse a date string in various formats:
/// - ISO 8601 dates: "2024-12-31", "2024-12-31T23:59:59", "2024-12-31T23:59:59Z"
/// - Relative durations: "30d", "7d", "1h", "30min", "1y"
pub fn parse_datetime_or_duration(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(datetime) = parse_relative_duration(input) {
        return Ok(datetime);
    }

    parse_iso_datetime(input)
}

/// Like [`parse_datetime_or_duration`], but "none" or an empty string clears the date
pub fn parse_optional_datetime(input: &str) -> Result<Option<DateTime<Utc>>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_datetime_or_duration(trimmed).map(Some)
}

/// Parse relative durations like "30d", "7d", "1h", etc.
/// Supported units: y (years), m (months), w (weeks), d (days), h (hours), min (minutes)
pub fn parse_relative_duration(input: &str) -> Result<DateTime<Utc>> {
    let Some(captures) = relative_duration_regex().captures(input) else {
        return Err(VaultEditError::invalid_argument(format!(
            "Invalid relative duration format: '{}'. Expected format like '30d', '7d', '1h', '30min', '1y'",
            input
        )));
    };

    let value: i64 = captures[1].parse().map_err(|_| {
        VaultEditError::invalid_argument(format!("Invalid number in duration: {}", &captures[1]))
    })?;

    let now = Utc::now();
    let offset = match &captures[2] {
        // 365.25 days per year
        "y" => Duration::days(value * 365 + value / 4),
        // 30.44 days per month
        "m" => Duration::days(value * 30 + (value * 44) / 100),
        "w" => Duration::weeks(value),
        "d" => Duration::days(value),
        "h" => Duration::hours(value),
        "min" => Duration::minutes(value),
        unit => {
            return Err(VaultEditError::invalid_argument(format!(
                "Unknown duration unit: {}",
                unit
            )))
        }
    };

    Ok(now + offset)
}

/// Parse ISO 8601 date/datetime strings
/// Supported formats:
/// - "2024-12-31" (date only, assumes end of day)
/// - "2024-12-31T23:59:59" (assumes UTC)
/// - "2024-12-31T23:59:59Z"
/// - "2024-12-31T23:59:59+00:00"
pub fn parse_iso_datetime(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(end_of_day) = date.and_hms_opt(23, 59, 59) {
            return Ok(end_of_day.and_utc());
        }
    }

    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(VaultEditError::invalid_argument(format!(
        "Invalid date format: '{}'. Expected ISO 8601 format (YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS, or YYYY-MM-DDTHH:MM:SSZ) or relative duration (30d, 7d, 1h, etc.)",
        input
    )))
}

pub fn is_expired(expires_on: Option<DateTime<Utc>>) -> bool {
    match expires_on {
        Some(expiry) => Utc::now() > expiry,
        None => false,
    }
}

pub fn is_not_yet_active(not_before: Option<DateTime<Utc>>) -> bool {
    match not_before {
        Some(nbf) => Utc::now() < nbf,
        None => false,
    }
}

/// Format a DateTime for display
pub fn format_datetime(dt: Option<DateTime<Utc>>) -> String {
    match dt {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}
