use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::api::{bad_request, period_label, store_failure, validate_day, validate_period};
use crate::auth::auth::AuthUser;
use crate::model::attendance::AttendanceCode;
use crate::model::employee::Employee;
use crate::store::{StoreError, Stores};
use crate::utils::dates::days_in_month;
use crate::utils::parse;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct UpdateAttendance {
    /// One of `p n a c m f o`; an empty string clears the day.
    #[schema(example = "p")]
    pub code: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PeriodRequest {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 10)]
    pub month: u32,
}

#[derive(Serialize, ToSchema)]
pub struct GridEmployee {
    pub matricule: String,
    pub surname: String,
    pub given_name: String,
    pub campaign: String,
}

#[derive(Serialize, ToSchema)]
pub struct MonthGrid {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 10)]
    pub month: u32,
    #[schema(example = "October 2026")]
    pub label: String,
    #[schema(example = 31)]
    pub days: u32,
    pub employees: Vec<GridEmployee>,
    /// Recorded codes keyed by matricule, then day.
    #[schema(value_type = Object)]
    pub entries: BTreeMap<String, BTreeMap<u32, AttendanceCode>>,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct OffDaySync {
    /// Days written as `o`.
    pub synced: usize,
    /// Employees whose days could not all be written.
    pub errors: usize,
}

/// Month attendance grid
#[utoipa::path(
    get,
    path = "/api/attendance/{year}/{month}",
    params(
        ("year", Path, description = "2000 to 2100"),
        ("month", Path, description = "1 to 12")
    ),
    responses(
        (status = 200, description = "Codes recorded for the month", body = MonthGrid),
        (status = 400, description = "Invalid period"),
        (status = 403, description = "HR/Admin only"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn month_grid(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<(i32, u32)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (year, month) = path.into_inner();
    validate_period(year, month)?;

    let employees = stores
        .employees
        .list()
        .await
        .map_err(|e| store_failure(e, "list employees"))?;
    let attendance = stores
        .attendance
        .month(year, month)
        .await
        .map_err(|e| store_failure(e, "read month attendance"))?;

    let mut entries = BTreeMap::new();
    for employee in &employees {
        if let Some(days) = attendance.for_employee(&employee.matricule) {
            let days: BTreeMap<u32, AttendanceCode> =
                days.iter().map(|(day, code)| (*day, *code)).collect();
            entries.insert(employee.matricule.clone(), days);
        }
    }

    Ok(HttpResponse::Ok().json(MonthGrid {
        year,
        month,
        label: period_label(year, month),
        days: days_in_month(year, month).unwrap_or(0),
        employees: employees
            .into_iter()
            .map(|e| GridEmployee {
                matricule: e.matricule,
                surname: e.surname,
                given_name: e.given_name,
                campaign: e.campaign,
            })
            .collect(),
        entries,
    }))
}

/// Record a day's attendance code
#[utoipa::path(
    put,
    path = "/api/attendance/{matricule}/{year}/{month}/{day}",
    params(
        ("matricule", Path, description = "Employee matricule"),
        ("year", Path, description = "2000 to 2100"),
        ("month", Path, description = "1 to 12"),
        ("day", Path, description = "Day of the month")
    ),
    request_body = UpdateAttendance,
    responses(
        (status = 200, description = "Attendance recorded", body = Object, example = json!({
            "message": "Attendance recorded", "code": "c", "previous": "p"
        })),
        (status = 400, description = "Invalid period, day or code"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_attendance(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<(String, i32, u32, u32)>,
    payload: web::Json<UpdateAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (matricule, year, month, day) = path.into_inner();
    validate_day(year, month, day)?;

    let raw = payload.code.trim();
    let code = if raw.is_empty() {
        None
    } else {
        Some(
            AttendanceCode::from_str(raw)
                .map_err(|_| bad_request(format!("Unknown attendance code '{raw}'")))?,
        )
    };

    let known = stores
        .employees
        .get(&matricule)
        .await
        .map_err(|e| store_failure(e, "fetch employee"))?;
    if known.is_none() {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    let previous = stores
        .attendance
        .set(&matricule, year, month, day, code)
        .await
        .map_err(|e| store_failure(e, "record attendance"))?;

    if code == Some(AttendanceCode::Leave) && previous != Some(AttendanceCode::Leave) {
        stores
            .employees
            .update(&matricule, &debit_leave_day)
            .await
            .map_err(|e| store_failure(e, "debit leave balance"))?;
    }

    info!(
        matricule = %matricule,
        year,
        month,
        day,
        code = ?code,
        "Attendance recorded"
    );
    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance recorded",
        "matricule": matricule,
        "year": year,
        "month": month,
        "day": day,
        "code": code,
        "previous": previous
    })))
}

/// One leave day taken, never below zero.
fn debit_leave_day(employee: &mut Employee) {
    let balance = (employee.current_leave_balance() - 1.0).max(0.0);
    employee.leave_balance = Value::from(parse::round_tenth(balance));
}

/// Marks every planned `OFF` day of the month as day off.
pub async fn sync_off_days(stores: &Stores, year: i32, month: u32) -> Result<OffDaySync, StoreError> {
    let employees = stores.employees.list().await?;
    let planning = stores.planning.month(year, month).await?;

    let mut result = OffDaySync::default();
    for employee in &employees {
        let mut failed = false;
        for day in planning.days_off(&employee.matricule) {
            match stores
                .attendance
                .set(&employee.matricule, year, month, day, Some(AttendanceCode::DayOff))
                .await
            {
                Ok(_) => result.synced += 1,
                Err(e) => {
                    warn!(matricule = %employee.matricule, year, month, day, error = %e, "Off day not synced");
                    failed = true;
                }
            }
        }
        if failed {
            result.errors += 1;
        }
    }

    info!(year, month, synced = result.synced, errors = result.errors, "Off days synced");
    Ok(result)
}

/// Copy planned off days into attendance
#[utoipa::path(
    post,
    path = "/api/attendance/sync-off-days",
    request_body = PeriodRequest,
    responses(
        (status = 200, description = "Off days written", body = OffDaySync),
        (status = 400, description = "Invalid period"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn sync_off_days_handler(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<PeriodRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    validate_period(payload.year, payload.month)?;

    let result = sync_off_days(&stores, payload.year, payload.month)
        .await
        .map_err(|e| store_failure(e, "sync off days"))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Off day sync finished: {} days added", result.synced),
        "data": result
    })))
}

/// Per-code totals of a month, used by the statistics endpoint.
pub fn code_counts(codes: impl Iterator<Item = AttendanceCode>) -> HashMap<AttendanceCode, usize> {
    let mut counts = HashMap::new();
    for code in codes {
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
}
