// src/schedule.rs

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

use crate::error::{Error, Result};

/// Until this hour (inclusive) the previous day's report is pulled instead,
/// since today's is still mostly empty.
pub const LAST_HOUR_FOR_PREVIOUS_DAY: u32 = 1;

/// Build the fixed offset used for the day boundary.
pub fn offset_from_hours(hours: i32) -> Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| Error::Config(format!("utc offset of {} hours is out of range", hours)))
}

/// Day whose report should be pulled when triggered at `now`.
pub fn target_day<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    let local = now.naive_local();
    if local.hour() <= LAST_HOUR_FOR_PREVIOUS_DAY {
        (local - Duration::days(1)).date()
    } else {
        local.date()
    }
}

/// `target_day` for a UTC instant seen from `offset`.
pub fn target_day_at(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    target_day(&now.with_timezone(&offset))
}
