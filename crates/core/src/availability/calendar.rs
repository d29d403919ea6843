//! Conversions between a location's wall clock and UTC instants.
//!
//! Locations carry a fixed UTC offset; a "local day" is the 24h range
//! between two local midnights expressed in UTC.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use crate::intervals::TimeRange;
use crate::types::Timestamp;

/// The UTC range covered by local date `date`.
pub fn local_day(date: NaiveDate, utc_offset_minutes: i32) -> TimeRange {
    let midnight =
        date.and_time(NaiveTime::MIN).and_utc() - Duration::minutes(i64::from(utc_offset_minutes));
    TimeRange {
        start: midnight,
        end: midnight + Duration::days(1),
    }
}

/// The UTC range for local minutes `[open_minute, close_minute)` on `date`.
pub fn minute_window(
    date: NaiveDate,
    open_minute: u16,
    close_minute: u16,
    utc_offset_minutes: i32,
) -> Option<TimeRange> {
    let day = local_day(date, utc_offset_minutes);
    TimeRange::from_bounds(
        day.start + Duration::minutes(i64::from(open_minute)),
        day.start + Duration::minutes(i64::from(close_minute)),
    )
}

/// 0 = Monday ... 6 = Sunday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// The local calendar date an instant falls on.
pub fn local_date(instant: Timestamp, utc_offset_minutes: i32) -> NaiveDate {
    (instant + Duration::minutes(i64::from(utc_offset_minutes))).date_naive()
}
