pub mod attendance;
pub mod clocking;
pub mod employee;
pub mod health;
pub mod leave;
pub mod payroll;
pub mod planning;

use actix_web::{HttpResponse, error::InternalError};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;
use crate::utils::dates::days_in_month;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// `400` with the usual `{"message": ...}` body.
pub(crate) fn bad_request(message: impl Into<String>) -> actix_web::Error {
    let message = message.into();
    let response = HttpResponse::BadRequest().json(json!({ "message": message }));
    InternalError::from_response(message, response).into()
}

/// Logs a store failure and turns it into a `500`.
pub(crate) fn store_failure(e: StoreError, action: &str) -> actix_web::Error {
    error!(error = %e, action, "Store operation failed");
    let response = HttpResponse::InternalServerError().json(json!({
        "message": "Something went wrong, Contact with system admin"
    }));
    InternalError::from_response(e, response).into()
}

pub(crate) fn validate_period(year: i32, month: u32) -> actix_web::Result<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(bad_request(format!(
            "Year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }
    if !(1..=12).contains(&month) {
        return Err(bad_request("Month must be between 1 and 12"));
    }
    Ok(())
}

pub(crate) fn validate_day(year: i32, month: u32, day: u32) -> actix_web::Result<()> {
    validate_period(year, month)?;
    match days_in_month(year, month) {
        Some(days) if (1..=days).contains(&day) => Ok(()),
        _ => Err(bad_request(format!("Day {day} is outside {year}-{month:02}"))),
    }
}

/// `"October 2026"`.
pub(crate) fn period_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Local wall-clock time, whole seconds.
pub(crate) fn now() -> NaiveTime {
    let now = chrono::Local::now().time();
    now.with_nanosecond(0).unwrap_or(now)
}
