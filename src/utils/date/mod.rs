// Date utility functions
// Maps schedule slots (weekday index, half-hour index) onto wall-clock time

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::models::schedule::{DAYS_PER_WEEK, HALF_HOURS_PER_DAY};

/// Index of `date` in the schedule week, Monday = 0.
pub fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Weekday for a schedule row. Out-of-range rows wrap around the week.
pub fn weekday_for_index(day: usize) -> Weekday {
    match day % DAYS_PER_WEEK {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// Wall-clock start of a half-hour slot, or `None` past the end of the day.
pub fn slot_start(half_hour: usize) -> Option<NaiveTime> {
    if half_hour >= HALF_HOURS_PER_DAY {
        return None;
    }
    let minute = if half_hour % 2 == 0 { 0 } else { 30 };
    NaiveTime::from_hms_opt((half_hour / 2) as u32, minute, 0)
}

/// Half-hour slot containing `time`.
pub fn slot_for_time(time: NaiveTime) -> usize {
    time.hour() as usize * 2 + usize::from(time.minute() >= 30)
}

/// "HH:MM" label used by text renderers for a slot column.
pub fn slot_label(half_hour: usize) -> String {
    slot_start(half_hour)
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_default()
}
