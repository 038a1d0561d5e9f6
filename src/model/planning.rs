use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

/// Length of a standard working day, used whenever no planned shift gives hours.
pub const STANDARD_DAY_HOURS: f64 = 8.0;

/// Shift code produced by the weekly planning import.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum ShiftCode {
    #[serde(rename = "OFF")]
    #[strum(serialize = "OFF")]
    Off,
    #[serde(rename = "JOUR")]
    #[strum(serialize = "JOUR")]
    Day,
    #[serde(rename = "NUIT")]
    #[strum(serialize = "NUIT")]
    Night,
    #[serde(rename = "MAT5")]
    #[strum(serialize = "MAT5")]
    Morning5,
    #[serde(rename = "MAT9")]
    #[strum(serialize = "MAT9")]
    Morning9,
    #[serde(rename = "CONGE")]
    #[strum(serialize = "CONGE")]
    Leave,
    #[serde(rename = "FORMATION")]
    #[strum(serialize = "FORMATION")]
    Training,
    #[serde(rename = "-")]
    #[strum(serialize = "-")]
    Unassigned,
}

impl ShiftCode {
    pub fn hours(self) -> f64 {
        match self {
            ShiftCode::Day | ShiftCode::Morning5 | ShiftCode::Morning9 => 8.0,
            ShiftCode::Night => 10.0,
            ShiftCode::Off | ShiftCode::Leave | ShiftCode::Training | ShiftCode::Unassigned => 0.0,
        }
    }
}

/// Day-length hook consumed by the attendance aggregator.
pub trait HoursPerDay {
    fn hours_for(&self, matricule: &str, year: i32, month: u32, day: u32) -> f64;
}

/// Planned shifts of one calendar month, keyed by matricule then day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthPlanning {
    pub year: i32,
    pub month: u32,
    shifts: HashMap<String, HashMap<u32, ShiftCode>>,
}

impl MonthPlanning {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            shifts: HashMap::new(),
        }
    }

    pub fn insert(&mut self, matricule: &str, day: u32, shift: ShiftCode) {
        self.shifts
            .entry(matricule.to_string())
            .or_default()
            .insert(day, shift);
    }

    pub fn shift(&self, matricule: &str, day: u32) -> Option<ShiftCode> {
        self.shifts.get(matricule)?.get(&day).copied()
    }

    /// Days planned `OFF` for the employee, ascending.
    pub fn days_off(&self, matricule: &str) -> Vec<u32> {
        let mut days: Vec<u32> = self
            .shifts
            .get(matricule)
            .map(|days| {
                days.iter()
                    .filter(|(_, shift)| **shift == ShiftCode::Off)
                    .map(|(day, _)| *day)
                    .collect()
            })
            .unwrap_or_default();
        days.sort_unstable();
        days
    }
}

impl HoursPerDay for MonthPlanning {
    /// Planned hours of the shift, or a standard day when nothing positive is planned.
    fn hours_for(&self, matricule: &str, year: i32, month: u32, day: u32) -> f64 {
        if (year, month) != (self.year, self.month) {
            return STANDARD_DAY_HOURS;
        }
        self.shift(matricule, day)
            .map(ShiftCode::hours)
            .filter(|h| *h > 0.0)
            .unwrap_or(STANDARD_DAY_HOURS)
    }
}
