use serde::Serialize;

use crate::model::attendance::{AttendanceCode, MonthAttendance};
use crate::model::planning::{HoursPerDay, STANDARD_DAY_HOURS};
use crate::utils::dates::days_in_month;

/// Category totals of one employee-month. Hour fields are decimal hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttendanceTotals {
    pub presence: f64,
    pub worked_real: f64,
    pub leave: f64,
    pub holiday: f64,
    pub night: f64,
    pub training: f64,
    pub training_days: u32,
    pub off_days: u32,
    pub absence: f64,
}

impl AttendanceTotals {
    /// Absence expressed in standard days, for display.
    pub fn absence_days(&self) -> f64 {
        self.absence / STANDARD_DAY_HOURS
    }

    fn record(&mut self, code: AttendanceCode, hours: f64) {
        match code {
            AttendanceCode::Present => {
                self.presence += hours;
                self.worked_real += hours;
            }
            AttendanceCode::Night => {
                self.presence += hours;
                self.night += hours;
                self.worked_real += hours;
            }
            AttendanceCode::Holiday => {
                self.presence += hours;
                self.holiday += hours;
                self.worked_real += hours;
            }
            AttendanceCode::Leave => self.leave += hours,
            AttendanceCode::Training => {
                self.training += hours;
                self.training_days += 1;
            }
            AttendanceCode::Absent => self.absence += hours,
            AttendanceCode::DayOff => self.off_days += 1,
        }
    }
}

/// Reduces the daily codes of `matricule` for the month into category totals.
///
/// Days without a code contribute nothing. An impossible month yields empty totals.
pub fn aggregate(
    matricule: &str,
    year: i32,
    month: u32,
    attendance: &MonthAttendance,
    hours: &impl HoursPerDay,
) -> AttendanceTotals {
    let mut totals = AttendanceTotals::default();
    let Some(days) = days_in_month(year, month) else {
        return totals;
    };

    for day in 1..=days {
        if let Some(code) = attendance.code(matricule, day) {
            totals.record(code, hours.hours_for(matricule, year, month, day));
        }
    }

    totals
}
