//! Monthly leave-balance accrual.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::model::employee::Employee;
use crate::store::{EmployeeRegistry, StoreError};
use crate::utils::{dates, parse::round_tenth};

/// Days of leave earned per elapsed month.
pub const DAYS_PER_MONTH: f64 = 2.5;
/// Months credited to a record that was never accrued.
pub const UNSTAMPED_MONTHS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AccrualSummary {
    /// Records processed.
    pub employees: usize,
    /// Records whose balance was credited.
    pub credited: usize,
}

/// Credits the months elapsed since the record's last accrual and restamps it.
///
/// Returns whether the balance changed.
pub fn accrue_employee(employee: &mut Employee, today: NaiveDate) -> bool {
    let months = match employee.last_accrual_period.as_deref() {
        None => UNSTAMPED_MONTHS,
        Some(stamp) => match dates::parse_year_month(stamp)
            .and_then(|(year, month)| dates::months_between(year, month, today))
        {
            Some(months) => months,
            None => {
                warn!(
                    matricule = %employee.matricule,
                    stamp,
                    "Unreadable accrual stamp, restamping without credit"
                );
                0
            }
        },
    };

    let credited = months > 0;
    if credited {
        let balance = employee.current_leave_balance() + DAYS_PER_MONTH * f64::from(months);
        employee.leave_balance = Value::from(round_tenth(balance));
    }
    employee.last_accrual_period = Some(dates::year_month(today));
    credited
}

/// Runs the accrual over the whole registry as one exclusive rewrite.
pub async fn accrue_all(
    registry: &dyn EmployeeRegistry,
    today: NaiveDate,
) -> Result<AccrualSummary, StoreError> {
    let credited = AtomicUsize::new(0);
    let employees = registry
        .update_all(&|employee: &mut Employee| {
            if accrue_employee(employee, today) {
                credited.fetch_add(1, Ordering::Relaxed);
            }
        })
        .await?;

    let summary = AccrualSummary {
        employees,
        credited: credited.into_inner(),
    };
    info!(
        period = %dates::year_month(today),
        employees = summary.employees,
        credited = summary.credited,
        "Leave accrual completed"
    );
    Ok(summary)
}
