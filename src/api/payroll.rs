use std::collections::BTreeMap;

use actix_web::{HttpResponse, Responder, web};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::IntoEnumIterator;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::api::attendance::code_counts;
use crate::api::{bad_request, period_label, store_failure, today, validate_period};
use crate::auth::auth::AuthUser;
use crate::model::attendance::AttendanceCode;
use crate::model::payslip::Payslip;
use crate::payroll::{PayrollCalculator, working_days};
use crate::store::Stores;
use crate::utils::parse::round_tenth;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CalculateQuery {
    /// Overrides the estimated working days (1 to 31).
    #[schema(example = 22)]
    pub working_days: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PayrollRun {
    #[schema(example = "October 2026")]
    pub period: String,
    pub year: i32,
    pub month: u32,
    #[schema(example = 22)]
    pub working_days: u32,
    /// `true` when the working days were estimated from the calendar.
    pub auto_working_days: bool,
    pub employee_count: usize,
    pub total_gross: i64,
    pub total_net: i64,
    pub payslips: Vec<Payslip>,
}

#[derive(Deserialize, ToSchema)]
pub struct ExportRequest {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 10)]
    pub month: u32,
    /// Restricts the export to these employees; all when absent or empty.
    pub matricules: Option<Vec<String>>,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct ExportTotals {
    pub gross_pay: i64,
    pub net_pay: i64,
    pub income_tax: i64,
    pub health_fund: i64,
    pub pension_fund: i64,
    pub social_contribution: i64,
    pub salary_advance: i64,
}

impl ExportTotals {
    fn of(payslips: &[Payslip]) -> Self {
        payslips.iter().fold(Self::default(), |mut t, p| {
            t.gross_pay += p.gross_pay;
            t.net_pay += p.net_pay;
            t.income_tax += p.income_tax;
            t.health_fund += p.health_fund;
            t.pension_fund += p.pension_fund;
            t.social_contribution += p.social_contribution;
            t.salary_advance += p.salary_advance;
            t
        })
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StatisticsQuery {
    /// Defaults to the current year.
    pub year: Option<i32>,
    /// Defaults to the current month.
    pub month: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct PayrollStatistics {
    pub year: i32,
    pub month: u32,
    pub headcount: usize,
    /// Attendance codes recorded in the month.
    pub attendance_entries: usize,
    pub off_days: usize,
    #[schema(value_type = Object, example = json!({"p": 120, "c": 4}))]
    pub code_counts: BTreeMap<String, usize>,
    /// Employees with a positive leave balance.
    pub active_employees: usize,
    pub mean_leave_balance: f64,
    pub working_days: u32,
}

/// Calculate monthly payslips
#[utoipa::path(
    get,
    path = "/api/payroll/calculate/{year}/{month}",
    params(
        ("year", Path, description = "2000 to 2100"),
        ("month", Path, description = "1 to 12"),
        CalculateQuery
    ),
    responses(
        (status = 200, description = "Payslips of every computable employee", body = PayrollRun),
        (status = 400, description = "Invalid period or working days"),
        (status = 401),
        (status = 403),
        (status = 500, description = "Stores unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn calculate_payroll(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<(i32, u32)>,
    query: web::Query<CalculateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (year, month) = path.into_inner();
    validate_period(year, month)?;

    if let Some(days) = query.working_days {
        if !(1..=31).contains(&days) {
            return Err(bad_request("Working days must be between 1 and 31"));
        }
    }

    let payslips = PayrollCalculator::new(&stores, today())
        .calculate(year, month, query.working_days)
        .await
        .map_err(|e| store_failure(e, "calculate payroll"))?;

    let working_days = query
        .working_days
        .unwrap_or_else(|| working_days::estimate(year, month));

    Ok(HttpResponse::Ok().json(PayrollRun {
        period: period_label(year, month),
        year,
        month,
        working_days,
        auto_working_days: query.working_days.is_none(),
        employee_count: payslips.len(),
        total_gross: payslips.iter().map(|p| p.gross_pay).sum(),
        total_net: payslips.iter().map(|p| p.net_pay).sum(),
        payslips,
    }))
}

/// Manual salary adjustments of a month
#[utoipa::path(
    get,
    path = "/api/payroll/adjustments/{year}/{month}",
    params(
        ("year", Path, description = "2000 to 2100"),
        ("month", Path, description = "1 to 12")
    ),
    responses(
        (status = 200, description = "Adjustments keyed by matricule", body = Object),
        (status = 400, description = "Invalid period"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_adjustments(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<(i32, u32)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (year, month) = path.into_inner();
    validate_period(year, month)?;

    let adjustments = stores
        .adjustments
        .month(year, month)
        .await
        .map_err(|e| store_failure(e, "list adjustments"))?;

    Ok(HttpResponse::Ok().json(adjustments))
}

/// Merge manual salary adjustment fields
#[utoipa::path(
    put,
    path = "/api/payroll/adjustments/{matricule}/{year}/{month}",
    params(
        ("matricule", Path, description = "Employee matricule"),
        ("year", Path, description = "2000 to 2100"),
        ("month", Path, description = "1 to 12")
    ),
    request_body = crate::model::adjustment::SalaryAdjustment,
    responses(
        (status = 200, description = "Adjustment after the merge", body = crate::model::adjustment::SalaryAdjustment),
        (status = 400, description = "Invalid period or body"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_adjustment(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<(String, i32, u32)>,
    body: web::Json<Map<String, Value>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (matricule, year, month) = path.into_inner();
    validate_period(year, month)?;

    let merged = stores
        .adjustments
        .merge(&matricule, year, month, body.into_inner())
        .await
        .map_err(|e| store_failure(e, "merge adjustment"))?;

    info!(matricule = %matricule, year, month, by = %auth.username, "Salary adjustment updated");
    Ok(HttpResponse::Ok().json(merged))
}

/// Export payslip sheets
#[utoipa::path(
    post,
    path = "/api/payroll/export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Payslips and totals", body = Object),
        (status = 400, description = "Invalid period"),
        (status = 404, description = "No payslip matches", body = Object, example = json!({
            "message": "No payroll data found for the requested employees"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn export_payslips(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<ExportRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let ExportRequest {
        year,
        month,
        matricules,
    } = payload.into_inner();
    validate_period(year, month)?;

    let mut payslips = PayrollCalculator::new(&stores, today())
        .calculate(year, month, None)
        .await
        .map_err(|e| store_failure(e, "export payroll"))?;

    if let Some(wanted) = matricules.filter(|m| !m.is_empty()) {
        payslips.retain(|p| wanted.contains(&p.matricule));
    }

    if payslips.is_empty() {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "No payroll data found for the requested employees"
        })));
    }

    info!(year, month, count = payslips.len(), by = %auth.username, "Payslips exported");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{} payslip(s) generated", payslips.len()),
        "period": period_label(year, month),
        "generated_on": today().to_string(),
        "count": payslips.len(),
        "totals": ExportTotals::of(&payslips),
        "payslips": payslips
    })))
}

/// Headcount and attendance statistics
#[utoipa::path(
    get,
    path = "/api/payroll/statistics",
    params(StatisticsQuery),
    responses(
        (status = 200, description = "Statistics of the month", body = PayrollStatistics),
        (status = 400, description = "Invalid period"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn statistics(
    auth: AuthUser,
    stores: web::Data<Stores>,
    query: web::Query<StatisticsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let now = today();
    let year = query.year.unwrap_or_else(|| now.year());
    let month = query.month.unwrap_or_else(|| now.month());
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

    let counts = code_counts(attendance.codes());
    let balances: Vec<f64> = employees.iter().map(|e| e.current_leave_balance()).collect();
    let mean_leave_balance = if balances.is_empty() {
        0.0
    } else {
        round_tenth(balances.iter().sum::<f64>() / balances.len() as f64)
    };

    Ok(HttpResponse::Ok().json(PayrollStatistics {
        year,
        month,
        headcount: employees.len(),
        attendance_entries: attendance.len(),
        off_days: counts.get(&AttendanceCode::DayOff).copied().unwrap_or(0),
        code_counts: AttendanceCode::iter()
            .map(|code| {
                (
                    code.as_ref().to_string(),
                    counts.get(&code).copied().unwrap_or(0),
                )
            })
            .collect(),
        active_employees: balances.iter().filter(|b| **b > 0.0).count(),
        mean_leave_balance,
        working_days: working_days::estimate(year, month),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, config, stores};
    use crate::model::employee::Employee;
    use crate::model::role::Role;
    use actix_web::{App, test, web::Data};

    async fn seed(stores: &Stores) {
        for (matricule, balance) in [("COL-1", json!(4)), ("COL-2", json!("0"))] {
            stores
                .employees
                .insert(Employee {
                    matricule: matricule.into(),
                    base_salary: json!(500000),
                    hire_date: Some("2020-01-06".into()),
                    leave_balance: balance,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        for day in [1, 2] {
            stores
                .attendance
                .set("COL-1", 2026, 10, day, Some(AttendanceCode::Present))
                .await
                .unwrap();
        }
        stores
            .attendance
            .set("COL-2", 2026, 10, 3, Some(AttendanceCode::DayOff))
            .await
            .unwrap();
    }

    macro_rules! app {
        ($dir:expr, $data:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new(config(&$dir)))
                    .app_data($data.clone())
                    .route(
                        "/payroll/calculate/{year}/{month}",
                        web::get().to(calculate_payroll),
                    )
                    .route(
                        "/payroll/adjustments/{year}/{month}",
                        web::get().to(list_adjustments),
                    )
                    .route(
                        "/payroll/adjustments/{matricule}/{year}/{month}",
                        web::put().to(update_adjustment),
                    )
                    .route("/payroll/export", web::post().to(export_payslips))
                    .route("/payroll/statistics", web::get().to(statistics)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn calculation_reports_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        seed(&data).await;
        let app = app!(dir, data);

        let req = test::TestRequest::get()
            .uri("/payroll/calculate/2026/10")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["period"], "October 2026");
        assert_eq!(body["working_days"], 22);
        assert_eq!(body["auto_working_days"], true);
        assert_eq!(body["employee_count"], 2);
        assert_eq!(body["payslips"][0]["matricule"], "COL-1");
        assert_eq!(body["payslips"][0]["worked_hours"], 16.0);

        let req = test::TestRequest::get()
            .uri("/payroll/calculate/2026/10?working_days=20")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["working_days"], 20);
        assert_eq!(body["auto_working_days"], false);
    }

    #[actix_web::test]
    async fn calculation_validates_input_and_role() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        let app = app!(dir, data);

        for (uri, role, status) in [
            ("/payroll/calculate/2026/13", Role::Hr, 400),
            ("/payroll/calculate/1999/1", Role::Hr, 400),
            ("/payroll/calculate/2026/10?working_days=0", Role::Hr, 400),
            ("/payroll/calculate/2026/10?working_days=40", Role::Hr, 400),
            ("/payroll/calculate/2026/10?working_days=lots", Role::Hr, 400),
            ("/payroll/calculate/2026/10", Role::Employee, 403),
        ] {
            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header(bearer(role, Some("COL-1")))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status, "{uri}");
        }

        let req = test::TestRequest::get()
            .uri("/payroll/calculate/2026/10")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 401);
    }

    #[actix_web::test]
    async fn adjustments_merge_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        let app = app!(dir, data);

        for body in [
            json!({"production_bonus": 1000}),
            json!({"salary_advance": "5 000"}),
        ] {
            let req = test::TestRequest::put()
                .uri("/payroll/adjustments/COL-1/2026/10")
                .insert_header(bearer(Role::Hr, None))
                .set_json(body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), 200);
        }

        let req = test::TestRequest::get()
            .uri("/payroll/adjustments/2026/10")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!({"COL-1": {"production_bonus": 1000, "salary_advance": "5 000"}})
        );
    }

    #[actix_web::test]
    async fn export_filters_by_matricule() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        seed(&data).await;
        let app = app!(dir, data);

        let req = test::TestRequest::post()
            .uri("/payroll/export")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"year": 2026, "month": 10, "matricules": ["COL-2"]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["payslips"][0]["matricule"], "COL-2");
        assert_eq!(body["totals"]["net_pay"], body["payslips"][0]["net_pay"]);

        let req = test::TestRequest::post()
            .uri("/payroll/export")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"year": 2026, "month": 10, "matricules": ["NOPE"]}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn statistics_of_a_month() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        seed(&data).await;
        let app = app!(dir, data);

        let req = test::TestRequest::get()
            .uri("/payroll/statistics?year=2026&month=10")
            .insert_header(bearer(Role::Admin, None))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["headcount"], 2);
        assert_eq!(body["attendance_entries"], 3);
        assert_eq!(body["off_days"], 1);
        assert_eq!(body["code_counts"]["p"], 2);
        assert_eq!(body["code_counts"]["a"], 0);
        assert_eq!(body["active_employees"], 1);
        assert_eq!(body["mean_leave_balance"], 2.0);
        assert_eq!(body["working_days"], 22);
    }
}
