//! US Eastern time helpers.
//!
//! The tracking worksheet records every timestamp in US Eastern local time
//! without an explicit offset, so the scanner needs to re-attach the right
//! offset (EST or EDT) before it can compare timestamps against "now".

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc, Weekday};

use crate::error::{Result, ScanError};

const EASTERN_STANDARD_SECS: i32 = 5 * 3600;
const EASTERN_DAYLIGHT_SECS: i32 = 4 * 3600;

/// Excel stores datetimes as fractional days since this epoch.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

fn standard_offset() -> FixedOffset {
    FixedOffset::west_opt(EASTERN_STANDARD_SECS).unwrap()
}

fn daylight_offset() -> FixedOffset {
    FixedOffset::west_opt(EASTERN_DAYLIGHT_SECS).unwrap()
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, nth: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let shift = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    first.checked_add_signed(Duration::days(i64::from(shift + 7 * (nth - 1))))
}

/// Returns the UTC offset in effect in US Eastern on the given local date.
///
/// Daylight saving runs from the second Sunday of March through the first
/// Sunday of November. The 02:00 transition hour is ignored; worksheet
/// timestamps land nowhere near it.
pub fn eastern_offset(date: NaiveDate) -> FixedOffset {
    let dst_start = nth_weekday(date.year(), 3, Weekday::Sun, 2);
    let dst_end = nth_weekday(date.year(), 11, Weekday::Sun, 1);
    match (dst_start, dst_end) {
        (Some(start), Some(end)) if date >= start && date < end => daylight_offset(),
        _ => standard_offset(),
    }
}

/// Current time expressed in US Eastern.
pub fn now_as_eastern() -> DateTime<FixedOffset> {
    as_eastern(Utc::now())
}

/// Converts a UTC instant into US Eastern.
pub fn as_eastern(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    let provisional = instant.with_timezone(&standard_offset());
    instant.with_timezone(&eastern_offset(provisional.date_naive()))
}

/// Interprets a naive worksheet timestamp as US Eastern local time.
pub fn naive_as_eastern(naive: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
    naive
        .and_local_timezone(eastern_offset(naive.date()))
        .single()
        .ok_or_else(|| ScanError::InvalidDate(format!("ambiguous local time {naive}")))
}

/// Converts an Excel datetime serial into a naive datetime.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let (year, month, day) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)?;
    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days))?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(secs))
}

const WORKSHEET_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses the timestamp formats that show up in the worksheet export.
pub fn parse_worksheet_datetime(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    for format in WORKSHEET_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }
    Err(ScanError::InvalidDate(format!(
        "unrecognised timestamp '{trimmed}'"
    )))
}

/// Encodes a date as the `yyyymmdd` integer used throughout the history sheet.
pub fn date_to_yyyymmdd(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// Decodes a `yyyymmdd` integer back into a date.
pub fn yyyymmdd_to_date(value: u32) -> Result<NaiveDate> {
    let year = (value / 10_000) as i32;
    let month = value / 100 % 100;
    let day = value % 100;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ScanError::InvalidDate(format!("invalid yyyymmdd value {value}")))
}

/// Short `mm/dd` rendering of a `yyyymmdd` integer for log messages.
pub fn short_mmdd(value: u32) -> String {
    format!("{:02}/{:02}", value / 100 % 100, value % 100)
}
