use crate::api::{store_failure, today};
use crate::auth::auth::AuthUser;
use crate::payroll::accrue_all;
use crate::store::Stores;
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use tracing::info;

/// Run the monthly leave accrual
///
/// Credits 2.5 days per month elapsed since each employee's last accrual.
#[utoipa::path(
    post,
    path = "/api/leave/accrue",
    responses(
        (status = 200, description = "Accrual completed", body = Object, example = json!({
            "message": "Leave balances updated",
            "data": {"employees": 12, "credited": 12}
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn accrue_leave(
    auth: AuthUser,
    stores: web::Data<Stores>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let summary = accrue_all(stores.employees.as_ref(), today())
        .await
        .map_err(|e| store_failure(e, "accrue leave"))?;

    info!(by = %auth.username, credited = summary.credited, "Leave accrual requested");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave balances updated",
        "data": summary
    })))
}
