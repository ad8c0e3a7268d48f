use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use sqlx::MySqlPool;

/// Liveness + database connectivity probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database reachable", body = Object, example = json!({
            "status": "OK",
            "timestamp": "2026-01-05T01:00:00Z"
        })),
        (status = 500, description = "Database unreachable")
    ),
    tag = "Health"
)]
pub async fn health(pool: web::Data<MySqlPool>) -> impl Responder {
    match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "OK",
            "timestamp": Utc::now().to_rfc3339()
        })),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "status": "Error",
                "message": "Database unreachable",
                "timestamp": Utc::now().to_rfc3339()
            }))
        }
    }
}
