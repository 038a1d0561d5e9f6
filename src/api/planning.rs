use std::str::FromStr;

use crate::api::{bad_request, store_failure, validate_day};
use crate::auth::auth::AuthUser;
use crate::model::planning::ShiftCode;
use crate::store::Stores;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct UpdateShift {
    /// `OFF JOUR NUIT MAT5 MAT9 CONGE FORMATION -`; an empty string clears the day.
    #[schema(example = "NUIT")]
    pub shift: String,
}

/// Record an imported planning shift
#[utoipa::path(
    put,
    path = "/api/planning/{matricule}/{year}/{month}/{day}",
    params(
        ("matricule", Path, description = "Employee matricule"),
        ("year", Path, description = "2000 to 2100"),
        ("month", Path, description = "1 to 12"),
        ("day", Path, description = "Day of the month")
    ),
    request_body = UpdateShift,
    responses(
        (status = 200, description = "Shift recorded", body = Object, example = json!({
            "message": "Shift recorded"
        })),
        (status = 400, description = "Invalid period, day or shift"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Planning",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_shift(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<(String, i32, u32, u32)>,
    payload: web::Json<UpdateShift>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (matricule, year, month, day) = path.into_inner();
    validate_day(year, month, day)?;

    let raw = payload.shift.trim();
    let shift = if raw.is_empty() {
        None
    } else {
        Some(ShiftCode::from_str(raw).map_err(|_| bad_request(format!("Unknown shift '{raw}'")))?)
    };

    stores
        .planning
        .set_shift(&matricule, year, month, day, shift)
        .await
        .map_err(|e| store_failure(e, "record shift"))?;

    debug!(matricule = %matricule, year, month, day, shift = ?shift, "Shift recorded");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Shift recorded",
        "shift": shift
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, config, stores};
    use crate::model::role::Role;
    use actix_web::{App, test, web::Data};

    #[actix_web::test]
    async fn shifts_feed_the_month_planning() {
        let dir = tempfile::tempdir().unwrap();
        let data = stores(&dir);
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config(&dir)))
                .app_data(data.clone())
                .route(
                    "/planning/{matricule}/{year}/{month}/{day}",
                    web::put().to(update_shift),
                ),
        )
        .await;

        for (uri, shift, status) in [
            ("/planning/COL-1/2026/10/1", "nuit", 200),
            ("/planning/COL-1/2026/10/2", "OFF", 200),
            ("/planning/COL-1/2026/10/3", "LATE", 400),
            ("/planning/COL-1/2026/10/32", "JOUR", 400),
        ] {
            let req = test::TestRequest::put()
                .uri(uri)
                .insert_header(bearer(Role::Hr, None))
                .set_json(json!({ "shift": shift }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status, "{uri}");
        }

        let plan = data.planning.month(2026, 10).await.unwrap();
        assert_eq!(plan.shift("COL-1", 1), Some(ShiftCode::Night));
        assert_eq!(plan.days_off("COL-1"), vec![2]);
    }
}
