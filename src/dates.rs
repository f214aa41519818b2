//! Calendar helpers for the planner.
//!
//! Pure functions over `chrono::NaiveDate`. Malformed dates never reach
//! here — they are rejected at the JSON deserialization boundary.

use chrono::{Datelike, NaiveDate, Weekday};

/// Gregorian weekday name for a date. This is the ONLY source of the
/// `day` field on tasks — clients never set it directly.
pub fn day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Inclusive range overlap: true iff the two ranges share at least one
/// calendar day. Both ranges are assumed start <= end.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// `dd/mm/yy` display form used on cards.
pub fn format_ddmmyy(date: NaiveDate) -> String {
    format!(
        "{:02}/{:02}/{:02}",
        date.day(),
        date.month(),
        date.year() % 100
    )
}

/// `"dd/mm/yy - dd/mm/yy"` — the `dates` string carried in week responses.
pub fn format_week_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", format_ddmmyy(start), format_ddmmyy(end))
}

/// Minutes → "1h 30m" / "1h" / "45m".
pub fn format_study_time(minutes: u32) -> String {
    if minutes >= 60 {
        let hours = minutes / 60;
        let mins = minutes % 60;
        if mins > 0 {
            format!("{hours}h {mins}m")
        } else {
            format!("{hours}h")
        }
    } else {
        format!("{minutes}m")
    }
}
