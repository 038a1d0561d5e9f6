use std::cmp::Ordering;
use std::collections::HashMap;

use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::{bad_request, now, store_failure, today, validate_period};
use crate::auth::auth::AuthUser;
use crate::model::clocking::{ClockRecord, DEFAULT_CAMPAIGN, parse_manual_time};
use crate::model::employee::Employee;
use crate::store::{ClockOut, Stores};
use crate::utils::dates::days_in_month;

#[derive(Deserialize, ToSchema)]
pub struct ClockInRequest {
    /// Registered matricule; a new one is generated when absent.
    #[schema(example = "COL-0042")]
    pub matricule: Option<String>,
    #[schema(example = "Rakoto")]
    pub surname: String,
    #[schema(example = "Hery")]
    pub given_name: String,
    pub campaign: Option<String>,
    #[schema(example = "JOUR")]
    pub shift: Option<String>,
    pub signature: String,
    /// Hand-entered `HH:MM`; the server clock is used when absent.
    #[schema(example = "08:00")]
    pub time: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ClockOutRequest {
    #[schema(example = "COL-0042")]
    pub matricule: String,
    pub signature: String,
    #[schema(example = "17:30")]
    pub time: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// `YYYY-MM-DD`, used together with `to`.
    #[schema(example = "2026-10-01")]
    pub from: Option<String>,
    #[schema(example = "2026-10-31")]
    pub to: Option<String>,
    /// Whole year, or one month of it with `month`, when no date range is given.
    #[schema(example = 2026)]
    pub year: Option<i32>,
    #[schema(example = 10)]
    pub month: Option<u32>,
    pub matricule: Option<String>,
    /// Case-insensitive substring.
    pub surname: Option<String>,
    /// Case-insensitive substring.
    pub given_name: Option<String>,
    pub campaign: Option<String>,
    pub shift: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: ClockRecord,
    pub surname: String,
    pub given_name: String,
    pub campaign: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClockHistory {
    pub data: Vec<HistoryEntry>,
    #[schema(example = 164.5)]
    pub total_hours: f64,
    pub total_records: usize,
}

fn generated_matricule() -> String {
    let id = Uuid::new_v4().to_string();
    format!("AG-{}", id[..8].to_uppercase())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Inclusive date range selected by the query.
fn history_period(query: &HistoryQuery) -> actix_web::Result<(NaiveDate, NaiveDate)> {
    let parse = |raw: &str| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| bad_request(format!("Invalid date {raw}, expected YYYY-MM-DD")))
    };

    if let (Some(from), Some(to)) = (non_blank(query.from.as_deref()), non_blank(query.to.as_deref())) {
        return Ok((parse(from)?, parse(to)?));
    }

    let Some(year) = query.year else {
        return Err(bad_request("Period not specified"));
    };
    let (first, last) = match query.month {
        Some(month) => (month, month),
        None => (1, 12),
    };
    validate_period(year, first)?;

    let start = NaiveDate::from_ymd_opt(year, first, 1);
    let end = days_in_month(year, last).and_then(|days| NaiveDate::from_ymd_opt(year, last, days));
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(bad_request("Period not specified")),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl HistoryQuery {
    fn matches(&self, entry: &HistoryEntry) -> bool {
        non_blank(self.matricule.as_deref()).is_none_or(|m| entry.record.matricule == m)
            && non_blank(self.surname.as_deref()).is_none_or(|s| contains_ignore_case(&entry.surname, s))
            && non_blank(self.given_name.as_deref())
                .is_none_or(|g| contains_ignore_case(&entry.given_name, g))
            && non_blank(self.campaign.as_deref()).is_none_or(|c| entry.campaign == c)
            && non_blank(self.shift.as_deref()).is_none_or(|s| entry.record.shift == s)
    }
}

/// Newest day first, then by name.
fn history_order(a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
    b.record
        .date
        .cmp(&a.record.date)
        .then_with(|| a.surname.cmp(&b.surname))
        .then_with(|| a.given_name.cmp(&b.given_name))
}

/// Filtered, sorted history with the total of the closed days' hours.
pub fn build_history(
    records: Vec<ClockRecord>,
    employees: &[Employee],
    query: &HistoryQuery,
) -> ClockHistory {
    let by_matricule: HashMap<&str, &Employee> =
        employees.iter().map(|e| (e.matricule.as_str(), e)).collect();

    let mut data: Vec<HistoryEntry> = records
        .into_iter()
        .map(|record| {
            let employee = by_matricule.get(record.matricule.as_str());
            HistoryEntry {
                surname: employee.map(|e| e.surname.clone()).unwrap_or_default(),
                given_name: employee.map(|e| e.given_name.clone()).unwrap_or_default(),
                campaign: employee.map(|e| e.campaign.clone()).unwrap_or_default(),
                record,
            }
        })
        .filter(|entry| query.matches(entry))
        .collect();
    data.sort_by(history_order);

    let total_hours: f64 = data.iter().filter_map(|e| e.record.hours_worked).sum();
    ClockHistory {
        total_records: data.len(),
        total_hours: (total_hours * 100.0).round() / 100.0,
        data,
    }
}

/// Clock In
#[utoipa::path(
    post,
    path = "/api/clock/in",
    request_body = ClockInRequest,
    responses(
        (status = 200, description = "Day opened", body = ClockRecord),
        (status = 400, description = "Missing name or invalid time"),
        (status = 403, description = "Clocking in for someone else"),
        (status = 409, description = "Already clocked in today"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn clock_in(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<ClockInRequest>,
) -> actix_web::Result<impl Responder> {
    let request = payload.into_inner();
    let surname = request.surname.trim();
    let given_name = request.given_name.trim();
    if surname.is_empty() || given_name.is_empty() {
        return Err(bad_request("Surname and given name are required"));
    }

    let at = match non_blank(request.time.as_deref()) {
        Some(raw) => parse_manual_time(raw)
            .ok_or_else(|| bad_request("Invalid time format, use HH:MM"))?,
        None => now(),
    };

    let matricule = match non_blank(request.matricule.as_deref()) {
        Some(matricule) => {
            auth.require_self_or_hr(matricule)?;
            matricule.to_string()
        }
        None => {
            auth.require_hr_or_admin()?;
            generated_matricule()
        }
    };

    let today = today();
    let known = stores
        .employees
        .get(&matricule)
        .await
        .map_err(|e| store_failure(e, "fetch employee"))?;
    if known.is_none() {
        let mut employee = Employee {
            matricule: matricule.clone(),
            surname: surname.to_string(),
            given_name: given_name.to_string(),
            campaign: non_blank(request.campaign.as_deref())
                .unwrap_or(DEFAULT_CAMPAIGN)
                .to_string(),
            ..Default::default()
        };
        employee.prepare_new(today);
        stores
            .employees
            .insert(employee)
            .await
            .map_err(|e| store_failure(e, "register employee"))?;
        info!(matricule = %matricule, "Employee registered at first clock-in");
    }

    let record = ClockRecord::open(matricule.clone(), today, at, request.shift, request.signature);
    let opened = stores
        .clocking
        .open_day(record.clone())
        .await
        .map_err(|e| store_failure(e, "clock in"))?;

    if !opened {
        let closed = stores
            .clocking
            .find(&matricule, today)
            .await
            .map_err(|e| store_failure(e, "fetch clock record"))?
            .is_some_and(|r| r.is_closed());
        let message = if closed {
            "Already clocked in and out today"
        } else {
            "Already clocked in today, clock out first"
        };
        return Ok(HttpResponse::Conflict().json(json!({ "message": message })));
    }

    info!(matricule = %matricule, time = %record.clock_in, shift = %record.shift, "Clocked in");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Clocked in",
        "data": record
    })))
}

/// Clock Out
#[utoipa::path(
    post,
    path = "/api/clock/out",
    request_body = ClockOutRequest,
    responses(
        (status = 200, description = "Day closed with the hours worked", body = ClockRecord),
        (status = 400, description = "Invalid time"),
        (status = 404, description = "No clock-in today"),
        (status = 409, description = "Already clocked out"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn clock_out(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<ClockOutRequest>,
) -> actix_web::Result<impl Responder> {
    let request = payload.into_inner();
    let matricule = request.matricule.trim().to_string();
    auth.require_self_or_hr(&matricule)?;

    let at = match non_blank(request.time.as_deref()) {
        Some(raw) => parse_manual_time(raw)
            .ok_or_else(|| bad_request("Invalid time format, use HH:MM"))?,
        None => now(),
    };

    let outcome = stores
        .clocking
        .close_day(&matricule, today(), at, request.signature)
        .await
        .map_err(|e| store_failure(e, "clock out"))?;

    match outcome {
        ClockOut::Closed(record) => {
            info!(
                matricule = %matricule,
                hours = record.hours_worked.unwrap_or_default(),
                "Clocked out"
            );
            Ok(HttpResponse::Ok().json(json!({
                "message": "Clocked out",
                "data": record
            })))
        }
        ClockOut::AlreadyClosed(_) => Ok(HttpResponse::Conflict().json(json!({
            "message": "Already clocked out today"
        }))),
        ClockOut::NotClockedIn => Ok(HttpResponse::NotFound().json(json!({
            "message": "No clock-in found for today"
        }))),
    }
}

/// Today's clock record of one employee
#[utoipa::path(
    get,
    path = "/api/clock/today/{matricule}",
    params(("matricule" = String, Path, description = "Employee matricule")),
    responses(
        (status = 200, description = "`data` is the record, or null before clock-in", body = Object),
        (status = 403, description = "Not your record")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn today_record(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let matricule = path.into_inner();
    auth.require_self_or_hr(&matricule)?;

    let record = stores
        .clocking
        .find(&matricule, today())
        .await
        .map_err(|e| store_failure(e, "fetch clock record"))?;
    Ok(HttpResponse::Ok().json(json!({ "data": record })))
}

/// Clock history
#[utoipa::path(
    get,
    path = "/api/clock/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Matching records and their total hours", body = ClockHistory),
        (status = 400, description = "Missing or invalid period"),
        (status = 403, description = "Not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Clock"
)]
pub async fn history(
    auth: AuthUser,
    stores: web::Data<Stores>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();
    match non_blank(query.matricule.as_deref()) {
        Some(matricule) => auth.require_self_or_hr(matricule)?,
        None => auth.require_hr_or_admin()?,
    }
    let (from, to) = history_period(&query)?;

    let records = stores
        .clocking
        .range(from, to)
        .await
        .map_err(|e| store_failure(e, "load clock history"))?;
    let employees = stores
        .employees
        .list()
        .await
        .map_err(|e| store_failure(e, "list employees"))?;

    Ok(HttpResponse::Ok().json(build_history(records, &employees, &query)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, config, stores};
    use crate::model::role::Role;
    use actix_web::{App, test, web::Data};
    use chrono::NaiveTime;
    use serde_json::Value;

    macro_rules! app {
        ($dir:expr, $data:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new(config(&$dir)))
                    .app_data($data.clone())
                    .route("/clock/in", web::post().to(clock_in))
                    .route("/clock/out", web::post().to(clock_out))
                    .route("/clock/today/{matricule}", web::get().to(today_record))
                    .route("/clock/history", web::get().to(history)),
            )
            .await
        };
    }

    fn record(matricule: &str, date: (i32, u32, u32), hours: Option<f64>, shift: &str) -> ClockRecord {
        let mut record = ClockRecord::open(
            matricule.into(),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            Some(shift.into()),
            String::new(),
        );
        record.hours_worked = hours;
        record
    }

    fn person(matricule: &str, surname: &str, given_name: &str, campaign: &str) -> Employee {
        Employee {
            matricule: matricule.into(),
            surname: surname.into(),
            given_name: given_name.into(),
            campaign: campaign.into(),
            ..Default::default()
        }
    }

    fn query(value: Value) -> HistoryQuery {
        serde_json::from_value(value).unwrap()
    }

    #[actix_web::test]
    async fn clock_in_then_out_records_the_hours() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        let app = app!(dir, data);

        let req = test::TestRequest::post()
            .uri("/clock/in")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .set_json(json!({
                "matricule": "COL-1",
                "surname": "Rakoto",
                "given_name": "Hery",
                "signature": "in",
                "time": "08:15"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["clock_in"], "08:15:00");
        assert_eq!(body["data"]["shift"], "JOUR");

        let registered = data.employees.get("COL-1").await.unwrap().unwrap();
        assert_eq!(registered.campaign, DEFAULT_CAMPAIGN);

        let req = test::TestRequest::post()
            .uri("/clock/in")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .set_json(json!({
                "matricule": "COL-1",
                "surname": "Rakoto",
                "given_name": "Hery",
                "signature": "in"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 409);

        let req = test::TestRequest::post()
            .uri("/clock/out")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .set_json(json!({"matricule": "COL-1", "signature": "out", "time": "17:45"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["hours_worked"], 9.5);
        assert_eq!(body["data"]["signature_out"], "out");

        let req = test::TestRequest::post()
            .uri("/clock/out")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .set_json(json!({"matricule": "COL-1", "signature": "out"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 409);

        let req = test::TestRequest::get()
            .uri("/clock/today/COL-1")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["clock_out"], "17:45:00");
    }

    #[actix_web::test]
    async fn clock_in_rejects_bad_input_and_foreign_matricules() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        let app = app!(dir, data);

        for (token, body, status) in [
            (
                bearer(Role::Hr, None),
                json!({"surname": " ", "given_name": "Hery", "signature": ""}),
                400,
            ),
            (
                bearer(Role::Hr, None),
                json!({"surname": "Rakoto", "given_name": "Hery", "signature": "", "time": "25:00"}),
                400,
            ),
            (
                bearer(Role::Employee, Some("COL-1")),
                json!({"matricule": "COL-2", "surname": "Rabe", "given_name": "Lova", "signature": ""}),
                403,
            ),
            (
                bearer(Role::Employee, Some("COL-1")),
                json!({"surname": "Rabe", "given_name": "Lova", "signature": ""}),
                403,
            ),
        ] {
            let req = test::TestRequest::post()
                .uri("/clock/in")
                .insert_header(token)
                .set_json(body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status);
        }
        assert!(data.employees.list().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unknown_person_gets_a_generated_matricule() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        let app = app!(dir, data);

        let req = test::TestRequest::post()
            .uri("/clock/in")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({
                "surname": "Rabe",
                "given_name": "Lova",
                "campaign": "Inbound",
                "shift": "NUIT",
                "signature": "in"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let matricule = body["data"]["matricule"].as_str().unwrap().to_string();
        assert!(matricule.starts_with("AG-"));
        assert_eq!(matricule.len(), 11);
        assert_eq!(body["data"]["shift"], "NUIT");

        let employee = data.employees.get(&matricule).await.unwrap().unwrap();
        assert_eq!(employee.surname, "Rabe");
        assert_eq!(employee.campaign, "Inbound");
    }

    #[actix_web::test]
    async fn clock_out_without_clock_in_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        let app = app!(dir, data);

        let req = test::TestRequest::post()
            .uri("/clock/out")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"matricule": "COL-9", "signature": "out"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::get()
            .uri("/clock/today/COL-9")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"].is_null());
    }

    #[actix_web::test]
    async fn history_filters_sort_and_total() {
        let employees = vec![
            person("E1", "Rakoto", "Hery", "Outbound"),
            person("E2", "Rabe", "Lova", "Inbound"),
            person("E3", "Rakotobe", "Aina", "Outbound"),
        ];
        let records = vec![
            record("E1", (2026, 10, 1), Some(8.0), "JOUR"),
            record("E2", (2026, 10, 2), Some(9.5), "NUIT"),
            record("E3", (2026, 10, 2), None, "JOUR"),
            record("E1", (2026, 10, 2), Some(7.25), "JOUR"),
        ];

        let all = build_history(records.clone(), &employees, &query(json!({})));
        assert_eq!(all.total_records, 4);
        assert_eq!(all.total_hours, 24.75);
        let order: Vec<&str> = all.data.iter().map(|e| e.record.matricule.as_str()).collect();
        assert_eq!(order, vec!["E2", "E1", "E3", "E1"]);

        let rakoto = build_history(records.clone(), &employees, &query(json!({"surname": "rakoto"})));
        assert_eq!(rakoto.total_records, 3);
        assert_eq!(rakoto.total_hours, 15.25);

        let night = build_history(records.clone(), &employees, &query(json!({"shift": "NUIT"})));
        assert_eq!(night.total_records, 1);
        assert_eq!(night.data[0].campaign, "Inbound");

        let exact = build_history(
            records,
            &employees,
            &query(json!({"matricule": "E1", "campaign": "Outbound"})),
        );
        assert_eq!(exact.total_records, 2);
    }

    #[actix_web::test]
    async fn history_period_needs_a_range_or_a_year() {
        let range = history_period(&query(json!({"from": "2026-10-05", "to": "2026-10-09"}))).unwrap();
        assert_eq!(range.0.to_string(), "2026-10-05");
        assert_eq!(range.1.to_string(), "2026-10-09");

        let month = history_period(&query(json!({"year": 2024, "month": 2}))).unwrap();
        assert_eq!(month.1.to_string(), "2024-02-29");

        let year = history_period(&query(json!({"year": 2026}))).unwrap();
        assert_eq!(year.0.to_string(), "2026-01-01");
        assert_eq!(year.1.to_string(), "2026-12-31");

        assert!(history_period(&query(json!({}))).is_err());
        assert!(history_period(&query(json!({"from": "2026-10-05"}))).is_err());
        assert!(history_period(&query(json!({"from": "5/10/2026", "to": "2026-10-09"}))).is_err());
        assert!(history_period(&query(json!({"year": 2026, "month": 13}))).is_err());
    }

    #[actix_web::test]
    async fn employees_only_read_their_own_history() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        data.clocking
            .open_day(record("COL-1", (2026, 10, 2), None, "JOUR"))
            .await
            .unwrap();
        let app = app!(dir, data);

        let req = test::TestRequest::get()
            .uri("/clock/history?year=2026&month=10")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        let req = test::TestRequest::get()
            .uri("/clock/history?year=2026&month=10&matricule=COL-1")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_records"], 1);

        let req = test::TestRequest::get()
            .uri("/clock/history")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);
    }
}
