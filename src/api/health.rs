use crate::store::Stores;
use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = Object, example = json!({
            "status": "ok", "store": "json"
        }))
    ),
    tag = "Health"
)]
#[get("/health")]
pub async fn health(stores: web::Data<Stores>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "store": stores.backend.as_ref(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
