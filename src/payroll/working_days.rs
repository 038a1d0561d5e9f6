use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::utils::dates::days_in_month;

/// Approximate weekday counts per month, used when the calendar cannot be computed.
const DEFAULT_WORKING_DAYS: [u32; 12] = [22, 20, 23, 21, 22, 22, 21, 23, 21, 22, 22, 20];
const FALLBACK_WORKING_DAYS: u32 = 22;

/// Monday to Friday days in the month, never less than 1.
pub fn estimate(year: i32, month: u32) -> u32 {
    match count_weekdays(year, month) {
        Some(days) => days.max(1),
        None => {
            let fallback = default_for(month);
            warn!(year, month, fallback, "Cannot compute working days, using default table");
            fallback
        }
    }
}

fn count_weekdays(year: i32, month: u32) -> Option<u32> {
    let days = days_in_month(year, month)?;
    let mut weekdays = 0;
    for day in 1..=days {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        if date.weekday().number_from_monday() <= 5 {
            weekdays += 1;
        }
    }
    Some(weekdays)
}

fn default_for(month: u32) -> u32 {
    month
        .checked_sub(1)
        .and_then(|index| DEFAULT_WORKING_DAYS.get(index as usize))
        .copied()
        .unwrap_or(FALLBACK_WORKING_DAYS)
}
