use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shift recorded when the clock-in does not name one.
pub const DEFAULT_SHIFT: &str = "JOUR";

/// Campaign given to an employee first seen at the clock.
pub const DEFAULT_CAMPAIGN: &str = "Standard";

fn default_shift() -> String {
    DEFAULT_SHIFT.to_string()
}

/// One employee's clock-in/clock-out of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "matricule": "COL-0042",
    "date": "2026-10-16",
    "clock_in": "08:00:00",
    "clock_out": "17:30:00",
    "shift": "JOUR",
    "hours_worked": 9.5,
    "signature_in": "data:image/png;base64,iVBORw0...",
    "signature_out": "data:image/png;base64,iVBORw0..."
}))]
pub struct ClockRecord {
    pub matricule: String,

    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,

    #[schema(value_type = String, example = "08:00:00")]
    pub clock_in: NaiveTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "17:30:00")]
    pub clock_out: Option<NaiveTime>,

    #[serde(default = "default_shift")]
    pub shift: String,

    /// Set once the day is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_worked: Option<f64>,

    #[serde(default)]
    pub signature_in: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_out: Option<String>,
}

impl ClockRecord {
    pub fn open(
        matricule: String,
        date: NaiveDate,
        clock_in: NaiveTime,
        shift: Option<String>,
        signature_in: String,
    ) -> Self {
        let shift = shift
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(default_shift);
        Self {
            matricule,
            date,
            clock_in,
            clock_out: None,
            shift,
            hours_worked: None,
            signature_in,
            signature_out: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.clock_out.is_some()
    }

    /// Records the clock-out and the hours worked. `false` when the day was already closed.
    pub fn close(&mut self, at: NaiveTime, signature: String) -> bool {
        if self.is_closed() {
            return false;
        }
        self.clock_out = Some(at);
        self.hours_worked = Some(hours_between(self.clock_in, at));
        self.signature_out = Some(signature);
        true
    }
}

/// Hours from `start` to `end` to two decimals, minutes resolution.
/// An `end` earlier than `start` belongs to the next day.
pub fn hours_between(start: NaiveTime, end: NaiveTime) -> f64 {
    let minutes = |t: NaiveTime| i64::from(t.hour() * 60 + t.minute());
    let mut span = minutes(end) - minutes(start);
    if span < 0 {
        span += 24 * 60;
    }
    (span as f64 / 60.0 * 100.0).round() / 100.0
}

/// Parses a hand-entered `H:MM` / `HH:MM` time.
pub fn parse_manual_time(raw: &str) -> Option<NaiveTime> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn record() -> ClockRecord {
        ClockRecord::open(
            "E1".into(),
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            t(8, 0),
            None,
            "sig-in".into(),
        )
    }

    #[test]
    fn manual_times_need_hours_and_two_digit_minutes() {
        assert_eq!(parse_manual_time("8:05"), Some(t(8, 5)));
        assert_eq!(parse_manual_time("17:30"), Some(t(17, 30)));
        assert_eq!(parse_manual_time(" 23:59 "), Some(t(23, 59)));
        assert_eq!(parse_manual_time("24:00"), None);
        assert_eq!(parse_manual_time("12:60"), None);
        assert_eq!(parse_manual_time("12:5"), None);
        assert_eq!(parse_manual_time("12:30:00"), None);
        assert_eq!(parse_manual_time("noon"), None);
        assert_eq!(parse_manual_time("+1:30"), None);
    }

    #[test]
    fn hours_wrap_past_midnight() {
        assert_eq!(hours_between(t(8, 0), t(17, 30)), 9.5);
        assert_eq!(hours_between(t(22, 0), t(6, 0)), 8.0);
        assert_eq!(hours_between(t(9, 0), t(9, 20)), 0.33);
        assert_eq!(hours_between(t(9, 0), t(9, 0)), 0.0);
    }

    #[test]
    fn blank_shift_uses_the_default() {
        assert_eq!(record().shift, DEFAULT_SHIFT);
        let night = ClockRecord::open(
            "E1".into(),
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            t(21, 0),
            Some(" NUIT ".into()),
            String::new(),
        );
        assert_eq!(night.shift, "NUIT");
    }

    #[test]
    fn a_day_closes_once() {
        let mut day = record();
        assert!(day.close(t(16, 45), "sig-out".into()));
        assert!(day.is_closed());
        assert_eq!(day.hours_worked, Some(8.75));

        assert!(!day.close(t(18, 0), "again".into()));
        assert_eq!(day.clock_out, Some(t(16, 45)));
        assert_eq!(day.signature_out.as_deref(), Some("sig-out"));
    }

    #[test]
    fn serialized_times_are_plain_strings() {
        let mut day = record();
        day.close(t(17, 0), "s".into());
        let value = serde_json::to_value(&day).unwrap();
        assert_eq!(value["date"], "2026-10-16");
        assert_eq!(value["clock_in"], "08:00:00");
        assert_eq!(value["clock_out"], "17:00:00");
        assert_eq!(value["hours_worked"], 9.0);
    }
}
