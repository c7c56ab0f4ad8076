//! Humanized durations ("1 hour", "3 days") used as reminder labels.
//!
//! Each unit is rounded to the nearest whole value and the first unit under
//! its threshold wins, so a label covers a window of lead times: "1 hour"
//! spans roughly 45 to 89 minutes before the event.

use chrono::Duration;

const SECONDS_THRESHOLD: i64 = 45;
const MINUTES_THRESHOLD: i64 = 45;
const HOURS_THRESHOLD: i64 = 22;
const DAYS_THRESHOLD: i64 = 26;
const MONTHS_THRESHOLD: i64 = 11;

const DAYS_PER_MONTH: f64 = 30.436875;
const DAYS_PER_YEAR: f64 = 365.2425;

/// Render a duration with the label granularity. Negative durations are
/// rendered by magnitude.
pub fn humanize(duration: Duration) -> String {
    let ms = duration.num_milliseconds().unsigned_abs() as f64;
    let seconds = (ms / 1_000.0).round() as i64;
    let minutes = (ms / 60_000.0).round() as i64;
    let hours = (ms / 3_600_000.0).round() as i64;
    let days = (ms / 86_400_000.0).round() as i64;
    let months = (ms / 86_400_000.0 / DAYS_PER_MONTH).round() as i64;
    let years = (ms / 86_400_000.0 / DAYS_PER_YEAR).round() as i64;

    if seconds < SECONDS_THRESHOLD {
        "a few seconds".to_string()
    } else if minutes <= 1 {
        unit(1, "minute")
    } else if minutes < MINUTES_THRESHOLD {
        unit(minutes, "minute")
    } else if hours <= 1 {
        unit(1, "hour")
    } else if hours < HOURS_THRESHOLD {
        unit(hours, "hour")
    } else if days <= 1 {
        unit(1, "day")
    } else if days < DAYS_THRESHOLD {
        unit(days, "day")
    } else if months <= 1 {
        unit(1, "month")
    } else if months < MONTHS_THRESHOLD {
        unit(months, "month")
    } else {
        unit(years.max(1), "year")
    }
}

fn unit(n: i64, name: &str) -> String {
    if n == 1 {
        format!("1 {name}")
    } else {
        format!("{n} {name}s")
    }
}

/// Canonical form of a configured label: single spaces, lowercase.
pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Whether `humanize` can ever return `label` (already normalized).
pub fn is_label(label: &str) -> bool {
    if label == "a few seconds" {
        return true;
    }
    let Some((count, unit)) = label.split_once(' ') else {
        return false;
    };
    let Ok(count) = count.parse::<i64>() else {
        return false;
    };
    let (singular, max) = match unit.trim_end_matches('s') {
        "minute" => ("minute", MINUTES_THRESHOLD - 1),
        "hour" => ("hour", HOURS_THRESHOLD - 1),
        "day" => ("day", DAYS_THRESHOLD - 1),
        "month" => ("month", MONTHS_THRESHOLD - 1),
        "year" => ("year", i64::MAX),
        _ => return false,
    };
    if count == 1 {
        unit == singular
    } else {
        (2..=max).contains(&count) && unit == format!("{singular}s")
    }
}
