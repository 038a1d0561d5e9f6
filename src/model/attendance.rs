use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};
use utoipa::ToSchema;

/// Daily attendance marker, one per employee-day.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum AttendanceCode {
    /// Present on a day shift.
    #[serde(rename = "p")]
    #[strum(serialize = "p")]
    Present,
    /// Present on a night shift.
    #[serde(rename = "n")]
    #[strum(serialize = "n")]
    Night,
    /// Unexcused absence.
    #[serde(rename = "a")]
    #[strum(serialize = "a")]
    Absent,
    /// Paid leave (congé).
    #[serde(rename = "c")]
    #[strum(serialize = "c")]
    Leave,
    /// Worked on a public holiday.
    #[serde(rename = "m")]
    #[strum(serialize = "m")]
    Holiday,
    /// Training day.
    #[serde(rename = "f")]
    #[strum(serialize = "f")]
    Training,
    /// Scheduled day off.
    #[serde(rename = "o")]
    #[strum(serialize = "o")]
    DayOff,
}

/// All attendance codes of one calendar month, keyed by matricule then day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthAttendance {
    pub year: i32,
    pub month: u32,
    entries: HashMap<String, HashMap<u32, AttendanceCode>>,
}

impl MonthAttendance {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, matricule: &str, day: u32, code: AttendanceCode) {
        self.entries
            .entry(matricule.to_string())
            .or_default()
            .insert(day, code);
    }

    pub fn code(&self, matricule: &str, day: u32) -> Option<AttendanceCode> {
        self.entries.get(matricule)?.get(&day).copied()
    }

    pub fn for_employee(&self, matricule: &str) -> Option<&HashMap<u32, AttendanceCode>> {
        self.entries.get(matricule)
    }

    /// Every recorded code of the month, in no particular order.
    pub fn codes(&self) -> impl Iterator<Item = AttendanceCode> + '_ {
        self.entries.values().flat_map(|days| days.values().copied())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
