//! Date normalization.
//!
//! Every date that reaches the ledger is reduced to a local calendar date
//! in the configured timezone. Input text is tried in order:
//!
//! 1. an exact `YYYY-MM-DD` date;
//! 2. an ISO-8601 date-time. With an offset it is converted to the target
//!    timezone before the date is taken; without one it is read as local
//!    time in the target timezone;
//! 3. the first 10 characters parsed as `YYYY-MM-DD`.
//!
//! The last stage tolerates legacy timestamp formats but also accepts
//! malformed text whose prefix happens to be a date (`2024-01-05junk`).
//! Only when all three stages fail is [`InvalidDateFormat`] returned.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Storage and display format of calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Years whose dates format as exactly `YYYY-MM-DD`.
pub const STORAGE_YEARS: RangeInclusive<i32> = 0..=9999;

/// Date-time layouts carrying an explicit UTC offset.
///
/// `%#z` also takes `Z` and hour-only offsets such as `+08`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// Date-time layouts without an offset (local time).
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Text that could not be read as a date by any parsing stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date format: {input:?} (expected YYYY-MM-DD or an ISO-8601 date-time)")]
pub struct InvalidDateFormat {
    /// The rejected input, as given.
    pub input: String,
}

/// Resolve an optional date argument.
///
/// An absent or empty value means "today" in `tz`.
///
/// # Examples
///
/// ```
/// use fridgeledger_core::{normalize_date, NaiveDate, Tz};
///
/// let d = normalize_date(Some("2024-03-01T23:30:00Z"), Tz::Asia__Shanghai).unwrap();
/// assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
/// ```
pub fn normalize_date(text: Option<&str>, tz: Tz) -> Result<NaiveDate, InvalidDateFormat> {
    match text {
        None => Ok(today_in(tz)),
        Some(s) if s.is_empty() => Ok(today_in(tz)),
        Some(s) => parse_date(s, tz),
    }
}

/// Parse date text using the three-stage precedence.
pub fn parse_date(text: &str, tz: Tz) -> Result<NaiveDate, InvalidDateFormat> {
    let s = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }

    if let Some(date) = parse_iso_datetime(s, tz) {
        return Ok(date);
    }

    let prefix: String = s.chars().take(10).collect();
    NaiveDate::parse_from_str(&prefix, DATE_FORMAT).map_err(|_| InvalidDateFormat {
        input: text.to_string(),
    })
}

fn parse_iso_datetime(s: &str, tz: Tz) -> Option<NaiveDate> {
    let with_offset = DateTime::parse_from_rfc3339(s).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    });
    if let Some(dt) = with_offset {
        return Some(dt.with_timezone(&tz).date_naive());
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())?;
    // A wall-clock time inside a DST gap has no local instant; its date
    // is still the written one.
    Some(
        tz.from_local_datetime(&naive)
            .earliest()
            .map_or_else(|| naive.date(), |dt| dt.date_naive()),
    )
}

/// Render a date in the 10-character storage form.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Whether `date` falls in [`STORAGE_YEARS`].
///
/// Dates outside it render with a sign or extra digits and would no longer
/// sort correctly as text.
#[must_use]
pub fn in_storage_range(date: NaiveDate) -> bool {
    STORAGE_YEARS.contains(&date.year())
}

/// Today's calendar date in `tz`.
#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// The current wall-clock time in `tz`, truncated to whole seconds.
#[must_use]
pub fn now_in(tz: Tz) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&tz).fixed_offset().trunc_subsecs(0)
}

/// `date + days`, or `None` when the result leaves chrono's range.
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    chrono::TimeDelta::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}
