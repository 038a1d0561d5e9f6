use chrono::{Datelike, NaiveDate};

/// Number of days in a Gregorian month, `None` when the month does not exist.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Parses a hire date written either `DD/MM/YYYY` or `YYYY-MM-DD`.
pub fn parse_hire_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    ["%d/%m/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .filter(|d| d.year() > 1900)
}

/// Calendar-aware tenure as whole years plus remaining whole months.
pub fn tenure(hired: NaiveDate, today: NaiveDate) -> (i32, i32) {
    let mut years = today.year() - hired.year();
    let mut months = today.month() as i32 - hired.month() as i32;

    if today.day() < hired.day() {
        months -= 1;
    }
    if months < 0 {
        years -= 1;
        months += 12;
    }

    (years, months)
}

/// Whole years of service on `today`; an anniversary not reached yet does not count.
pub fn tenure_years(hired: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - hired.year();
    if (today.month(), today.day()) < (hired.month(), hired.day()) {
        years -= 1;
    }
    years
}

/// Raw day count between hire date and `today` (negative for future hires).
pub fn elapsed_days(hired: NaiveDate, today: NaiveDate) -> i64 {
    today.signed_duration_since(hired).num_days()
}

/// Formats a `YYYY-MM` period stamp.
pub fn year_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parses a `YYYY-MM` period stamp.
pub fn parse_year_month(raw: &str) -> Option<(i32, u32)> {
    let (year, month) = raw.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Whole calendar months from the stamp's month to `today`'s month.
///
/// `None` when the distance does not fit an `i32`.
pub fn months_between(year: i32, month: u32, today: NaiveDate) -> Option<i32> {
    today
        .year()
        .checked_sub(year)?
        .checked_mul(12)?
        .checked_add(today.month() as i32 - month as i32)
}
